//! Matrix persistence and small delimited-file helpers.
//!
//! Matrices are stored as gzip-compressed TSV: a `gene` header cell followed
//! by sample ids, then one row per gene. Values are written in Rust's
//! shortest round-trip decimal form, and the gzip header carries no
//! timestamp, so the same matrix always produces the same bytes.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::{Compression, GzBuilder};
use ndarray::Array2;
use oncoexpr_common::{OncoexprError, Result};
use tracing::{debug, info};

use crate::matrix::ExpressionMatrix;

/// Whether `path` names a gzip-compressed file.
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Field delimiter for `path`: comma for `.csv` / `.csv.gz`, tab otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".csv") {
        b','
    } else {
        b'\t'
    }
}

/// Open a text file, transparently decompressing `.gz`.
pub fn open_text(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| OncoexprError::io(path, e))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Write `matrix` as gzip-compressed TSV. Overwrites any existing file.
pub fn write_matrix(matrix: &ExpressionMatrix, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| OncoexprError::io(path, e))?;
    let encoder = GzBuilder::new().write(BufWriter::new(file), Compression::default());
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(encoder);

    let mut header = Vec::with_capacity(matrix.n_samples() + 1);
    header.push("gene".to_string());
    header.extend(matrix.sample_ids().iter().cloned());
    writer.write_record(&header).map_err(|e| OncoexprError::csv(path, e))?;

    let values = matrix.values();
    for (gene, row) in matrix.gene_ids().iter().zip(values.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(gene.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| OncoexprError::csv(path, e))?;
    }

    let encoder = writer
        .into_inner()
        .map_err(|e| OncoexprError::io(path, std::io::Error::new(e.error().kind(), e.to_string())))?;
    let mut inner = encoder.finish().map_err(|e| OncoexprError::io(path, e))?;
    inner.flush().map_err(|e| OncoexprError::io(path, e))?;

    info!(
        path = %path.display(),
        n_genes = matrix.n_genes(),
        n_samples = matrix.n_samples(),
        "Wrote expression matrix"
    );
    Ok(())
}

/// Read a matrix written by [`write_matrix`], or any tab/comma delimited
/// genes-by-samples table with a header row (optionally gzip-compressed).
pub fn read_matrix(path: &Path) -> Result<ExpressionMatrix> {
    debug!(path = %path.display(), "Loading expression matrix");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .flexible(true)
        .from_reader(open_text(path)?);

    let headers = reader
        .headers()
        .map_err(|e| OncoexprError::csv(path, e))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(OncoexprError::input(format!(
            "{} has no header row",
            path.display()
        )));
    }
    let sample_ids: Vec<String> = headers.iter().skip(1).map(|s| s.trim().to_string()).collect();
    let n_samples = sample_ids.len();

    let mut gene_ids = Vec::new();
    let mut flat = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| OncoexprError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != n_samples + 1 {
            return Err(OncoexprError::input(format!(
                "{} line {line}: expected {} fields, found {}",
                path.display(),
                n_samples + 1,
                record.len()
            )));
        }
        gene_ids.push(record[0].trim().to_string());
        for field in record.iter().skip(1) {
            let value: f64 = field.trim().parse().map_err(|_| {
                OncoexprError::input(format!(
                    "{} line {line}: value {field:?} is not a number",
                    path.display()
                ))
            })?;
            flat.push(value);
        }
    }

    let values = Array2::from_shape_vec((gene_ids.len(), n_samples), flat)
        .map_err(|e| OncoexprError::input(format!("{}: {e}", path.display())))?;
    let matrix = ExpressionMatrix::new(values, gene_ids, sample_ids)
        .map_err(|e| OncoexprError::input(format!("{}: {e}", path.display())))?;

    info!(
        path = %path.display(),
        n_genes = matrix.n_genes(),
        n_samples = matrix.n_samples(),
        "Loaded expression matrix"
    );
    Ok(matrix)
}

/// Read a sample → group table. The file must have a header naming a
/// `sample` column and a `group` column (case-insensitive); other columns are
/// ignored. Returned in file order.
pub fn read_sample_groups(path: &Path) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(open_text(path)?);

    let headers = reader
        .headers()
        .map_err(|e| OncoexprError::csv(path, e))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                OncoexprError::input(format!("{} is missing a {name:?} column", path.display()))
            })
    };
    let sample_col = column("sample")?;
    let group_col = column("group")?;

    let mut seen = HashSet::new();
    let mut groups = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| OncoexprError::csv(path, e))?;
        let (Some(sample), Some(group)) = (record.get(sample_col), record.get(group_col)) else {
            continue;
        };
        if sample.is_empty() || group.is_empty() {
            return Err(OncoexprError::input(format!(
                "{}: blank sample or group at line {}",
                path.display(),
                record.position().map(|p| p.line()).unwrap_or(0)
            )));
        }
        if !seen.insert(sample.to_string()) {
            return Err(OncoexprError::input(format!(
                "{}: sample {sample} listed more than once",
                path.display()
            )));
        }
        groups.push((sample.to_string(), group.to_string()));
    }

    if groups.is_empty() {
        return Err(OncoexprError::input(format!(
            "{} contains no sample groups",
            path.display()
        )));
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncoexpr_common::ErrorKind;
    use pretty_assertions::assert_eq;

    fn sample_matrix() -> ExpressionMatrix {
        ExpressionMatrix::from_rows(
            &[
                ("CD276", vec![12.5, 0.0, 3.25]),
                ("DLL3", vec![0.1, 48.0, 1.0]),
            ],
            vec!["TCGA-01".into(), "TCGA-02".into(), "TCGA-03".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_write_then_read_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohort_expression_matrix.tsv.gz");
        let matrix = sample_matrix();
        write_matrix(&matrix, &path).unwrap();
        let loaded = read_matrix(&path).unwrap();
        assert_eq!(loaded, matrix);
    }

    #[test]
    fn test_write_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tsv.gz");
        let b = dir.path().join("b.tsv.gz");
        write_matrix(&sample_matrix(), &a).unwrap();
        write_matrix(&sample_matrix(), &b).unwrap();
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }

    #[test]
    fn test_read_plain_csv_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        std::fs::write(&path, "gene,s1,s2\nKRAS,1.5,2\nTP53,0,7.25\n").unwrap();
        let m = read_matrix(&path).unwrap();
        assert_eq!(m.sample_ids(), &["s1", "s2"]);
        assert_eq!(m.gene_row("TP53").unwrap().to_vec(), vec![0.0, 7.25]);
    }

    #[test]
    fn test_read_rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.tsv");
        std::fs::write(&path, "gene\ts1\ts2\nKRAS\t1.5\n").unwrap();
        let err = read_matrix(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("expected 3 fields"), "{err}");
    }

    #[test]
    fn test_read_missing_file_is_input_error() {
        let err = read_matrix(Path::new("/definitely/not/here.tsv.gz")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_read_header_only_gives_zero_genes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.tsv");
        std::fs::write(&path, "gene\n").unwrap();
        let m = read_matrix(&path).unwrap();
        assert_eq!(m.n_samples(), 0);
        assert_eq!(m.n_genes(), 0);
    }

    #[test]
    fn test_read_sample_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.tsv");
        std::fs::write(&path, "Sample\tGroup\ns1\ttumor\ns2\tnormal\n").unwrap();
        let groups = read_sample_groups(&path).unwrap();
        assert_eq!(
            groups,
            vec![
                ("s1".to_string(), "tumor".to_string()),
                ("s2".to_string(), "normal".to_string())
            ]
        );
    }

    #[test]
    fn test_read_sample_groups_requires_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.tsv");
        std::fs::write(&path, "id\tlabel\ns1\ttumor\n").unwrap();
        assert!(read_sample_groups(&path).is_err());
    }

    #[test]
    fn test_delimiter_detection() {
        assert_eq!(delimiter_for(Path::new("a.csv")), b',');
        assert_eq!(delimiter_for(Path::new("a.CSV.gz")), b',');
        assert_eq!(delimiter_for(Path::new("a.tsv.gz")), b'\t');
        assert_eq!(delimiter_for(Path::new("a.txt")), b'\t');
    }
}
