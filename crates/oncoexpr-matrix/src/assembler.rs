//! Cohort matrix assembly from per-sample quantification files.
//!
//! Each sample contributes one file: a two-column gene/value table, tab
//! separated (comma for `.csv`), optionally gzip-compressed. Lines starting
//! with `#` are comments and a non-numeric first row is treated as a header.
//!
//! The assembled row set is the union of all genes, sorted. A gene that a
//! sample's file does not mention is filled with `0.0` (not expressed).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use oncoexpr_common::naming::EXPRESSION_MATRIX;
use oncoexpr_common::{OncoexprError, Result};
use tracing::{debug, info};

use crate::io::{delimiter_for, open_text};
use crate::matrix::ExpressionMatrix;

/// Recognised quantification file extensions (each also accepted with `.gz`).
pub const QUANT_EXTENSIONS: [&str; 3] = ["tsv", "txt", "csv"];

/// Value used for a gene that a sample's file does not list.
pub const MISSING_FILL: f64 = 0.0;

/// One sample's quantification file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub sample_id: String,
    pub path: PathBuf,
}

impl SampleFile {
    pub fn new(sample_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            sample_id: sample_id.into(),
            path: path.into(),
        }
    }

    /// Derive the sample id from the file name, if it has a recognised
    /// quantification extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        sample_id_from_path(path).map(|id| Self::new(id, path))
    }
}

/// `TCGA-06-0125.tsv.gz` → `TCGA-06-0125`. `None` for other extensions.
pub fn sample_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    let base_len = lower.strip_suffix(".gz").map_or(lower.len(), str::len);
    let base = &lower[..base_len];
    QUANT_EXTENSIONS.iter().find_map(|ext| {
        let stem_len = base.strip_suffix(&format!(".{ext}"))?.len();
        let id = &name[..stem_len];
        (!id.is_empty()).then(|| id.to_string())
    })
}

/// List quantification files in `dir`, sorted by file name. Hidden files,
/// sub-directories and previously assembled `*expression_matrix.tsv.gz`
/// files are skipped.
pub fn discover_sample_files(dir: &Path) -> Result<Vec<SampleFile>> {
    if !dir.is_dir() {
        return Err(OncoexprError::input(format!(
            "data directory {} does not exist or is not a directory",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| OncoexprError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OncoexprError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !path.is_file() {
            continue;
        }
        // A cohort matrix from an earlier run written into the same directory.
        if name.ends_with(EXPRESSION_MATRIX) {
            debug!(path = %path.display(), "Skipping assembled expression matrix");
            continue;
        }
        match SampleFile::from_path(&path) {
            Some(file) => files.push(file),
            None => debug!(path = %path.display(), "Skipping non-quantification file"),
        }
    }
    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    if files.is_empty() {
        return Err(OncoexprError::input(format!(
            "no quantification files (.tsv/.txt/.csv, optionally .gz) found in {}",
            dir.display()
        )));
    }
    Ok(files)
}

/// Parse one two-column gene/value file.
pub fn read_quant_file(path: &Path) -> Result<Vec<(String, f64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(open_text(path)?);

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut first = true;

    for result in reader.records() {
        let record = result.map_err(|e| OncoexprError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != 2 {
            return Err(OncoexprError::input(format!(
                "{} line {line}: expected a two-column gene/value row, found {} fields",
                path.display(),
                record.len()
            )));
        }

        let gene = &record[0];
        let raw = &record[1];
        let value = match raw.parse::<f64>() {
            Ok(v) => v,
            Err(_) if first => {
                debug!(path = %path.display(), header = ?record, "Skipping header row");
                first = false;
                continue;
            }
            Err(_) => {
                return Err(OncoexprError::input(format!(
                    "{} line {line}: value {raw:?} for gene {gene:?} is not a number",
                    path.display()
                )));
            }
        };
        first = false;

        if gene.is_empty() {
            return Err(OncoexprError::input(format!(
                "{} line {line}: empty gene identifier",
                path.display()
            )));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(OncoexprError::input(format!(
                "{} line {line}: expression value {value} for {gene} must be finite and non-negative",
                path.display()
            )));
        }
        if !seen.insert(gene.to_string()) {
            return Err(OncoexprError::input(format!(
                "{} line {line}: gene {gene} appears more than once",
                path.display()
            )));
        }
        entries.push((gene.to_string(), value));
    }

    if entries.is_empty() {
        return Err(OncoexprError::input(format!(
            "{} contains no gene/value rows",
            path.display()
        )));
    }
    Ok(entries)
}

/// Merge per-sample files into one matrix. Columns follow `files` order.
pub fn assemble(files: &[SampleFile]) -> Result<ExpressionMatrix> {
    if files.is_empty() {
        return Err(OncoexprError::input("no quantification files to assemble"));
    }

    let mut seen_samples = HashSet::new();
    for file in files {
        if !seen_samples.insert(file.sample_id.as_str()) {
            return Err(OncoexprError::input(format!(
                "duplicate sample id {} ({})",
                file.sample_id,
                file.path.display()
            )));
        }
    }

    let mut per_sample = Vec::with_capacity(files.len());
    let mut all_genes = BTreeSet::new();
    for file in files {
        let entries = read_quant_file(&file.path)?;
        debug!(sample = %file.sample_id, n_genes = entries.len(), "Parsed quantification file");
        all_genes.extend(entries.iter().map(|(g, _)| g.clone()));
        per_sample.push(entries);
    }

    if all_genes.is_empty() {
        return Err(OncoexprError::input(
            "quantification files contain no gene rows",
        ));
    }

    let gene_ids: Vec<String> = all_genes.into_iter().collect();
    let row_of: HashMap<&str, usize> = gene_ids
        .iter()
        .enumerate()
        .map(|(i, g)| (g.as_str(), i))
        .collect();

    let mut values = Array2::from_elem((gene_ids.len(), files.len()), MISSING_FILL);
    let mut observed = 0usize;
    for (col, entries) in per_sample.iter().enumerate() {
        for (gene, value) in entries {
            values[[row_of[gene.as_str()], col]] = *value;
            observed += 1;
        }
    }
    let filled = gene_ids.len() * files.len() - observed;

    let sample_ids = files.iter().map(|f| f.sample_id.clone()).collect();
    let matrix = ExpressionMatrix::new(values, gene_ids, sample_ids)?;

    info!(
        n_genes = matrix.n_genes(),
        n_samples = matrix.n_samples(),
        filled_cells = filled,
        "Assembled expression matrix"
    );
    Ok(matrix)
}

/// Discover and assemble every quantification file in `dir`.
pub fn assemble_from_dir(dir: &Path) -> Result<ExpressionMatrix> {
    let files = discover_sample_files(dir)?;
    info!(dir = %dir.display(), n_files = files.len(), "Assembling cohort");
    assemble(&files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncoexpr_common::ErrorKind;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_sample_id_from_path() {
        assert_eq!(sample_id_from_path(Path::new("x/TCGA-06-0125.tsv.gz")).as_deref(), Some("TCGA-06-0125"));
        assert_eq!(sample_id_from_path(Path::new("s1.CSV")).as_deref(), Some("s1"));
        assert_eq!(sample_id_from_path(Path::new("s1.rna_seq.txt")).as_deref(), Some("s1.rna_seq"));
        assert_eq!(sample_id_from_path(Path::new("notes.md")), None);
        assert_eq!(sample_id_from_path(Path::new(".tsv")), None);
    }

    #[test]
    fn test_union_of_genes_with_zero_fill() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s1.tsv", "gene\ttpm\nKRAS\t5.5\nTP53\t2\n");
        write(dir.path(), "s2.tsv", "# comment\nTP53\t1.25\nMYC\t9\n");

        let m = assemble_from_dir(dir.path()).unwrap();
        assert_eq!(m.sample_ids(), &["s1", "s2"]);
        assert_eq!(m.gene_ids(), &["KRAS", "MYC", "TP53"]);
        assert_eq!(m.gene_row("KRAS").unwrap().to_vec(), vec![5.5, 0.0]);
        assert_eq!(m.gene_row("MYC").unwrap().to_vec(), vec![0.0, 9.0]);
        assert_eq!(m.gene_row("TP53").unwrap().to_vec(), vec![2.0, 1.25]);
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.csv", "DLL3,4\nSEZ6,0.5\n");
        write(dir.path(), "a.csv", "SEZ6,3\n");
        let first = assemble_from_dir(dir.path()).unwrap();
        let second = assemble_from_dir(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.sample_ids(), &["a", "b"]);
    }

    #[test]
    fn test_empty_directory_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", "not data");
        let err = assemble_from_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_missing_directory_is_input_error() {
        let err = assemble_from_dir(Path::new("/no/such/cohort")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_previous_matrix_in_data_dir_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s1.tsv", "KRAS\t5\n");
        let first = assemble_from_dir(dir.path()).unwrap();
        crate::io::write_matrix(&first, &dir.path().join("gbm_expression_matrix.tsv.gz")).unwrap();

        let files = discover_sample_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].sample_id, "s1");
        assert_eq!(assemble_from_dir(dir.path()).unwrap(), first);
    }

    #[test]
    fn test_empty_sample_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s1.tsv", "KRAS\t5\n");
        write(dir.path(), "s2.tsv", "");
        let err = assemble_from_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("s2.tsv"), "{err}");
    }

    #[test]
    fn test_header_only_sample_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s1.tsv", "KRAS\t5\n");
        write(dir.path(), "s3.tsv", "gene\ttpm\n# no rows\n");
        let err = assemble_from_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("no gene/value rows"), "{err}");
    }

    #[test]
    fn test_three_column_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s1.tsv", "KRAS\t5\t6\n");
        let err = read_quant_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("two-column"), "{err}");
    }

    #[test]
    fn test_non_numeric_after_first_row_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s1.tsv", "KRAS\t5\nTP53\thigh\n");
        let err = read_quant_file(&path).unwrap_err();
        assert!(err.to_string().contains("TP53"), "{err}");
    }

    #[test]
    fn test_negative_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s1.tsv", "KRAS\t-1\n");
        assert!(read_quant_file(&path).is_err());
    }

    #[test]
    fn test_repeated_gene_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s1.tsv", "KRAS\t1\nKRAS\t2\n");
        let err = read_quant_file(&path).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn test_duplicate_sample_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "s1.tsv", "KRAS\t1\n");
        let b = write(dir.path(), "s1.csv", "KRAS,1\n");
        let err = assemble(&[SampleFile::new("s1", a), SampleFile::new("s1", b)]).unwrap_err();
        assert!(err.to_string().contains("duplicate sample id"), "{err}");
    }

    #[test]
    fn test_gzip_input_is_read() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s9.tsv.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        enc.write_all(b"KRAS\t3.5\n").unwrap();
        enc.finish().unwrap();

        let m = assemble_from_dir(dir.path()).unwrap();
        assert_eq!(m.sample_ids(), &["s9"]);
        assert_eq!(m.gene_row("KRAS").unwrap().to_vec(), vec![3.5]);
    }
}
