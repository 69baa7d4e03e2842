//! Pathway over-representation of a marker gene list.
//!
//! For each pathway, the one-sided hypergeometric p-value of seeing at least
//! the observed number of query genes in the set, given the universe of
//! genes the markers were drawn from. P-values are BH-adjusted across all
//! tested pathways.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use oncoexpr_common::{OncoexprError, Result};
use oncoexpr_matrix::io::{delimiter_for, open_text};
use serde::Serialize;
use statrs::distribution::{DiscreteCDF, Hypergeometric};
use tracing::{debug, info, warn};

use crate::fdr::benjamini_hochberg;
use crate::gene_sets::GeneSetLibrary;
use crate::table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentRecord {
    pub pathway: String,
    /// Query genes found in the pathway.
    pub overlap: usize,
    /// Pathway genes present in the universe.
    pub set_size: usize,
    pub query_size: usize,
    pub universe_size: usize,
    pub fold_enrichment: f64,
    pub pvalue: f64,
    pub padj: f64,
    /// Overlapping genes, sorted.
    pub genes: Vec<String>,
}

/// Genes of a marker/statistics table, split into universe and query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneTable {
    pub universe: Vec<String>,
    pub query: Vec<String>,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "t" => Some(true),
        "false" | "0" | "no" | "n" | "f" | "" => Some(false),
        _ => None,
    }
}

/// Read a gene table with a `gene` column. When an `is_marker` column is
/// present the flagged rows form the query; otherwise the first `top_n`
/// rows do. Every gene in the table is part of the universe.
pub fn read_gene_table(path: &Path, top_n: usize) -> Result<GeneTable> {
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
    let gene_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("gene"))
        .ok_or_else(|| {
            OncoexprError::input(format!("{} has no \"gene\" column", path.display()))
        })?;
    let marker_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("is_marker"));

    let mut universe = Vec::new();
    let mut query = Vec::new();
    let mut seen = HashSet::new();
    for result in reader.records() {
        let record = result.map_err(|e| OncoexprError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let gene = record.get(gene_col).unwrap_or_default();
        if gene.is_empty() {
            return Err(OncoexprError::input(format!(
                "{} line {line}: empty gene",
                path.display()
            )));
        }
        if !seen.insert(gene.to_string()) {
            warn!(path = %path.display(), gene, "Gene listed more than once; keeping first row");
            continue;
        }

        let in_query = match marker_col {
            Some(col) => {
                let raw = record.get(col).unwrap_or_default();
                parse_flag(raw).ok_or_else(|| {
                    OncoexprError::input(format!(
                        "{} line {line}: is_marker value {raw:?} is not a boolean",
                        path.display()
                    ))
                })?
            }
            None => universe.len() < top_n,
        };
        if in_query {
            query.push(gene.to_string());
        }
        universe.push(gene.to_string());
    }

    if universe.is_empty() {
        return Err(OncoexprError::input(format!("{} lists no genes", path.display())));
    }
    debug!(
        path = %path.display(),
        universe = universe.len(),
        query = query.len(),
        flagged = marker_col.is_some(),
        "Loaded gene table"
    );
    Ok(GeneTable { universe, query })
}

/// Test every pathway of `library` for over-representation of `query`
/// within `universe`. Pathways with fewer than `min_overlap` query genes are
/// not reported. Sorted by p-value, then pathway name.
///
/// BH adjustment counts only the reported pathways, not every set in the
/// library, so `padj` is less conservative than a library-wide correction.
pub fn over_representation(
    query: &[String],
    universe: &[String],
    library: &GeneSetLibrary,
    min_overlap: usize,
) -> Result<Vec<EnrichmentRecord>> {
    let universe: HashSet<&str> = universe.iter().map(String::as_str).collect();
    let query: BTreeSet<&str> = query
        .iter()
        .map(String::as_str)
        .filter(|g| universe.contains(g))
        .collect();
    if query.is_empty() {
        return Err(OncoexprError::computation(
            "enrichment query is empty: no marker genes in the universe",
        ));
    }

    let big_n = universe.len() as u64;
    let n = query.len() as u64;
    let min_overlap = min_overlap.max(1);

    let mut records = Vec::new();
    for set in library.sets() {
        let members: BTreeSet<&str> = set
            .genes
            .iter()
            .map(String::as_str)
            .filter(|g| universe.contains(g))
            .collect();
        if members.is_empty() {
            continue;
        }
        let hits: Vec<String> = members
            .intersection(&query)
            .map(|g| g.to_string())
            .collect();
        if hits.len() < min_overlap {
            continue;
        }

        let k = hits.len() as u64;
        let big_k = members.len() as u64;
        let dist = Hypergeometric::new(big_n, big_k, n).map_err(|e| {
            OncoexprError::computation(format!("hypergeometric test for {}: {e}", set.name))
        })?;
        // sf(k - 1) = P(X >= k)
        let pvalue = dist.sf(k - 1).clamp(0.0, 1.0);
        let fold_enrichment = (k as f64 / n as f64) / (big_k as f64 / big_n as f64);

        records.push(EnrichmentRecord {
            pathway: set.name.clone(),
            overlap: hits.len(),
            set_size: members.len(),
            query_size: query.len(),
            universe_size: universe.len(),
            fold_enrichment,
            pvalue,
            padj: f64::NAN,
            genes: hits,
        });
    }

    let pvalues: Vec<f64> = records.iter().map(|r| r.pvalue).collect();
    for (record, padj) in records.iter_mut().zip(benjamini_hochberg(&pvalues)) {
        record.padj = padj;
    }
    records.sort_by(|a, b| {
        a.pvalue
            .partial_cmp(&b.pvalue)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pathway.cmp(&b.pathway))
    });

    debug!(
        library = library.name(),
        tested = library.len(),
        reported = records.len(),
        query = query.len(),
        universe = universe.len(),
        "Computed pathway enrichment"
    );
    Ok(records)
}

pub fn write_enrichment_table(records: &[EnrichmentRecord], path: &Path) -> Result<()> {
    let mut writer = table::tsv_writer(path)?;
    table::write_row(
        &mut writer,
        path,
        [
            "pathway",
            "overlap",
            "set_size",
            "query_size",
            "universe_size",
            "fold_enrichment",
            "pvalue",
            "padj",
            "genes",
        ],
    )?;
    for r in records {
        table::write_row(
            &mut writer,
            path,
            [
                r.pathway.clone(),
                r.overlap.to_string(),
                r.set_size.to_string(),
                r.query_size.to_string(),
                r.universe_size.to_string(),
                table::fmt_value(r.fold_enrichment),
                table::fmt_value(r.pvalue),
                table::fmt_value(r.padj),
                r.genes.join(","),
            ],
        )?;
    }
    table::finish(writer, path)?;
    info!(path = %path.display(), n_pathways = records.len(), "Wrote pathway enrichment");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncoexpr_common::ErrorKind;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn library() -> GeneSetLibrary {
        GeneSetLibrary::parse_gmt(
            "test",
            "NOTCH\tna\tDLL3\tNOTCH1\tHES1\tJAG1\n\
             CHECKPOINT\tna\tCD274\tCD276\tPDCD1\n\
             ELSEWHERE\tna\tNOT_IN_UNIVERSE\n",
        )
        .unwrap()
    }

    fn universe() -> Vec<String> {
        let mut genes = strings(&["DLL3", "NOTCH1", "HES1", "JAG1", "CD274", "CD276", "PDCD1"]);
        genes.extend((0..13).map(|i| format!("BG{i}")));
        genes
    }

    #[test]
    fn test_enriched_pathway_ranks_first() {
        let query = strings(&["DLL3", "NOTCH1", "HES1", "CD276"]);
        let records = over_representation(&query, &universe(), &library(), 1).unwrap();

        assert_eq!(records.len(), 2);
        let top = &records[0];
        assert_eq!(top.pathway, "NOTCH");
        assert_eq!(top.overlap, 3);
        assert_eq!(top.set_size, 4);
        assert_eq!(top.query_size, 4);
        assert_eq!(top.universe_size, 20);
        assert_eq!(top.genes, strings(&["DLL3", "HES1", "NOTCH1"]));
        // (3/4) / (4/20)
        assert!((top.fold_enrichment - 3.75).abs() < 1e-12);
        assert!(top.pvalue < records[1].pvalue);
        assert!(top.padj >= top.pvalue);
    }

    #[test]
    fn test_hypergeometric_tail_value() {
        // N=20, K=4, n=4, k=3: P(X>=3) = [C(4,3)C(16,1) + C(4,4)C(16,0)] / C(20,4)
        let query = strings(&["DLL3", "NOTCH1", "HES1", "CD276"]);
        let records = over_representation(&query, &universe(), &library(), 1).unwrap();
        let expected = (4.0 * 16.0 + 1.0) / 4845.0;
        assert!((records[0].pvalue - expected).abs() < 1e-10, "{}", records[0].pvalue);
    }

    #[test]
    fn test_min_overlap_filters() {
        let query = strings(&["DLL3", "NOTCH1", "CD276"]);
        let records = over_representation(&query, &universe(), &library(), 2).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pathway, "NOTCH");
    }

    #[test]
    fn test_empty_query_is_computation_error() {
        let err = over_representation(&strings(&["UNKNOWN"]), &universe(), &library(), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Computation);
    }

    #[test]
    fn test_read_gene_table_with_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.tsv");
        std::fs::write(
            &path,
            "gene\tmean\tis_marker\nDLL3\t9.1\ttrue\nSEZ6\t4.0\tfalse\nCD276\t3.3\ttrue\n",
        )
        .unwrap();
        let table = read_gene_table(&path, 1).unwrap();
        assert_eq!(table.universe, strings(&["DLL3", "SEZ6", "CD276"]));
        assert_eq!(table.query, strings(&["DLL3", "CD276"]));
    }

    #[test]
    fn test_read_gene_table_top_n_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranked.csv");
        std::fs::write(&path, "Gene,score\nA,3\nB,2\nC,1\n").unwrap();
        let table = read_gene_table(&path, 2).unwrap();
        assert_eq!(table.query, strings(&["A", "B"]));
        assert_eq!(table.universe.len(), 3);
    }

    #[test]
    fn test_read_gene_table_requires_gene_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        std::fs::write(&path, "symbol\tscore\nA\t1\n").unwrap();
        assert_eq!(read_gene_table(&path, 5).unwrap_err().kind(), ErrorKind::Input);
    }

    #[test]
    fn test_write_enrichment_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enrichment.tsv");
        let query = strings(&["DLL3", "NOTCH1"]);
        let records = over_representation(&query, &universe(), &library(), 1).unwrap();
        write_enrichment_table(&records, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("pathway\toverlap\tset_size\tquery_size\tuniverse_size\tfold_enrichment\tpvalue\tpadj\tgenes")
        );
        assert!(lines.next().unwrap().ends_with("DLL3,NOTCH1"));
        assert!(lines.next().is_none());
    }
}
