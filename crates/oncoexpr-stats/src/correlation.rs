//! Gene-gene correlation of expression profiles across samples.
//!
//! Each gene's vector of sample values is one variable. A profile with zero
//! variance has no defined correlation with anything; those entries are NaN
//! in memory and `NA` on disk. The diagonal is always exactly 1.0.

use std::path::Path;

use ndarray::{Array2, ArrayView1};
use oncoexpr_common::{GeneSet, OncoexprError, Result};
use oncoexpr_matrix::ExpressionMatrix;
use serde::Serialize;
use tracing::{debug, info};

use crate::pvalue::correlation_pvalue;
use crate::ranks::average_ranks;
use crate::table;

/// Square, symmetric Pearson correlation matrix over the requested genes.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    genes: Vec<String>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Coefficient at `(i, j)`; NaN when undefined.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.genes.iter().position(|g| g == a)?;
        let j = self.genes.iter().position(|g| g == b)?;
        Some(self.get(i, j))
    }
}

/// Correlation statistics for one unordered gene pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseCorrelation {
    pub gene1: String,
    pub gene2: String,
    pub pearson_r: Option<f64>,
    pub pearson_p: Option<f64>,
    pub spearman_r: Option<f64>,
    pub spearman_p: Option<f64>,
    pub n_samples: usize,
}

/// Pearson coefficient, or `None` for fewer than two observations or a
/// constant profile.
pub fn pearson(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let mx = x.sum() / n as f64;
    let my = y.sum() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y.iter()) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if is_constant(x) || is_constant(y) || sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Exact equality: a constant whose mean does not round-trip still leaves
/// tiny non-zero deviations.
fn is_constant(x: ArrayView1<'_, f64>) -> bool {
    x.iter().all(|v| *v == x[0])
}

/// Spearman coefficient: Pearson over average ranks.
pub fn spearman(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Option<f64> {
    let rx = ndarray::Array1::from(average_ranks(&x.to_vec()));
    let ry = ndarray::Array1::from(average_ranks(&y.to_vec()));
    pearson(rx.view(), ry.view())
}

/// Restrict `matrix` to `genes`, enforcing the preconditions shared by every
/// correlation entry point.
fn correlation_input(matrix: &ExpressionMatrix, genes: &GeneSet) -> Result<ExpressionMatrix> {
    if genes.len() < 2 {
        return Err(OncoexprError::computation(format!(
            "correlation needs at least 2 genes, got {}",
            genes.len()
        )));
    }
    let subset = matrix.restrict(genes)?;
    match subset.n_samples() {
        0 => Err(OncoexprError::input(
            "expression matrix has no samples; correlation is undefined",
        )),
        1 => Err(OncoexprError::computation(
            "correlation is undefined for a single sample",
        )),
        _ => Ok(subset),
    }
}

/// Pearson correlation matrix over `genes`, in gene-set order.
pub fn correlate(matrix: &ExpressionMatrix, genes: &GeneSet) -> Result<CorrelationMatrix> {
    let subset = correlation_input(matrix, genes)?;
    let n = subset.n_genes();
    let profiles = subset.values();

    let mut values = Array2::from_elem((n, n), f64::NAN);
    for i in 0..n {
        values[[i, i]] = 1.0;
        for j in i + 1..n {
            let r = pearson(profiles.row(i), profiles.row(j)).unwrap_or(f64::NAN);
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    let undefined = values.iter().filter(|v| v.is_nan()).count();
    debug!(
        n_genes = n,
        n_samples = subset.n_samples(),
        undefined,
        "Computed correlation matrix"
    );
    Ok(CorrelationMatrix {
        genes: subset.gene_ids().to_vec(),
        values,
    })
}

/// Pearson and Spearman statistics for every `i < j` pair in gene-set order.
pub fn pairwise_correlations(
    matrix: &ExpressionMatrix,
    genes: &GeneSet,
) -> Result<Vec<PairwiseCorrelation>> {
    let subset = correlation_input(matrix, genes)?;
    let n_samples = subset.n_samples();
    let profiles = subset.values();
    let ids = subset.gene_ids();

    let mut records = Vec::new();
    for i in 0..ids.len() {
        for j in i + 1..ids.len() {
            let (x, y) = (profiles.row(i), profiles.row(j));
            let pearson_r = pearson(x, y);
            let spearman_r = spearman(x, y);
            records.push(PairwiseCorrelation {
                gene1: ids[i].clone(),
                gene2: ids[j].clone(),
                pearson_r,
                pearson_p: pearson_r.and_then(|r| correlation_pvalue(r, n_samples)),
                spearman_r,
                spearman_p: spearman_r.and_then(|r| correlation_pvalue(r, n_samples)),
                n_samples,
            });
        }
    }
    Ok(records)
}

/// Square TSV with a leading `gene` column; undefined cells are `NA`.
pub fn write_correlation_matrix(corr: &CorrelationMatrix, path: &Path) -> Result<()> {
    let mut writer = table::tsv_writer(path)?;
    let header = std::iter::once("gene".to_string()).chain(corr.genes.iter().cloned());
    table::write_row(&mut writer, path, header)?;
    for (gene, row) in corr.genes.iter().zip(corr.values.rows()) {
        let record = std::iter::once(gene.clone()).chain(row.iter().map(|&v| table::fmt_value(v)));
        table::write_row(&mut writer, path, record)?;
    }
    table::finish(writer, path)?;
    info!(path = %path.display(), n_genes = corr.len(), "Wrote correlation matrix");
    Ok(())
}

pub fn write_pairwise_correlations(records: &[PairwiseCorrelation], path: &Path) -> Result<()> {
    let mut writer = table::tsv_writer(path)?;
    table::write_row(
        &mut writer,
        path,
        [
            "gene1",
            "gene2",
            "pearson_r",
            "pearson_p",
            "spearman_r",
            "spearman_p",
            "n_samples",
        ],
    )?;
    for r in records {
        table::write_row(
            &mut writer,
            path,
            [
                r.gene1.clone(),
                r.gene2.clone(),
                table::fmt_opt(r.pearson_r),
                table::fmt_opt(r.pearson_p),
                table::fmt_opt(r.spearman_r),
                table::fmt_opt(r.spearman_p),
                r.n_samples.to_string(),
            ],
        )?;
    }
    table::finish(writer, path)?;
    info!(path = %path.display(), n_pairs = records.len(), "Wrote pairwise correlations");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use oncoexpr_common::ErrorKind;

    fn samples(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("s{i}")).collect()
    }

    fn matrix() -> ExpressionMatrix {
        ExpressionMatrix::from_rows(
            &[
                ("B7H3", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
                ("DLL3", vec![2.0, 4.0, 6.0, 8.0, 10.0]),
                ("SEZ6", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
                ("FLAT", vec![3.0, 3.0, 3.0, 3.0, 3.0]),
                ("EXP", vec![1.0, 2.0, 4.0, 8.0, 100.0]),
            ],
            samples(5),
        )
        .unwrap()
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let genes = GeneSet::parse_list("B7H3,DLL3,SEZ6,EXP").unwrap();
        let corr = correlate(&matrix(), &genes).unwrap();
        assert_eq!(corr.genes(), genes.as_slice());
        for i in 0..corr.len() {
            assert_eq!(corr.get(i, i), 1.0);
            for j in 0..corr.len() {
                assert_eq!(corr.get(i, j), corr.get(j, i));
                assert!((-1.0..=1.0).contains(&corr.get(i, j)));
            }
        }
        assert!((corr.get_by_name("B7H3", "DLL3").unwrap() - 1.0).abs() < 1e-12);
        assert!((corr.get_by_name("B7H3", "SEZ6").unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_profile_is_undefined() {
        let genes = GeneSet::parse_list("B7H3,FLAT").unwrap();
        let corr = correlate(&matrix(), &genes).unwrap();
        assert!(corr.get(0, 1).is_nan());
        assert_eq!(corr.get(1, 1), 1.0);
    }

    #[test]
    fn test_inexact_constant_profile_is_undefined() {
        let m = ExpressionMatrix::from_rows(
            &[
                ("LOW", vec![0.1, 0.1, 0.1]),
                ("RISE", vec![1.0, 2.0, 3.0]),
            ],
            samples(3),
        )
        .unwrap();
        let genes = GeneSet::parse_list("LOW,RISE").unwrap();

        assert_eq!(pearson(m.gene_row("LOW").unwrap(), m.gene_row("RISE").unwrap()), None);
        assert!(correlate(&m, &genes).unwrap().get(0, 1).is_nan());
        let pairs = pairwise_correlations(&m, &genes).unwrap();
        assert_eq!(pairs[0].pearson_r, None);
        assert_eq!(pairs[0].pearson_p, None);
        assert_eq!(pairs[0].spearman_r, None);
    }

    #[test]
    fn test_single_gene_is_computation_error() {
        let genes = GeneSet::parse_list("DLL3").unwrap();
        let err = correlate(&matrix(), &genes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Computation);
    }

    #[test]
    fn test_missing_gene_is_configuration_error() {
        let genes = GeneSet::parse_list("DLL3,CD276").unwrap();
        let err = correlate(&matrix(), &genes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("CD276"));
    }

    #[test]
    fn test_sample_count_preconditions() {
        let genes = GeneSet::parse_list("A,B").unwrap();
        let one = ExpressionMatrix::from_rows(&[("A", vec![1.0]), ("B", vec![2.0])], samples(1))
            .unwrap();
        assert_eq!(
            correlate(&one, &genes).unwrap_err().kind(),
            ErrorKind::Computation
        );

        let none = ExpressionMatrix::new(
            Array2::zeros((2, 0)),
            vec!["A".into(), "B".into()],
            vec![],
        )
        .unwrap();
        assert_eq!(correlate(&none, &genes).unwrap_err().kind(), ErrorKind::Input);
    }

    #[test]
    fn test_spearman_ignores_monotone_transform() {
        let m = matrix();
        let x = m.gene_row("B7H3").unwrap();
        let y = m.gene_row("EXP").unwrap();
        assert!((spearman(x, y).unwrap() - 1.0).abs() < 1e-12);
        assert!(pearson(x, y).unwrap() < 0.9);
    }

    #[test]
    fn test_spearman_with_ties() {
        let x = array![1.0, 2.0, 2.0, 3.0];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let rho = spearman(x.view(), y.view()).unwrap();
        // ranks x = [1, 2.5, 2.5, 4]
        let expected = pearson(array![1.0, 2.5, 2.5, 4.0].view(), y.view()).unwrap();
        assert!((rho - expected).abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_records() {
        let genes = GeneSet::parse_list("B7H3,DLL3,FLAT").unwrap();
        let records = pairwise_correlations(&matrix(), &genes).unwrap();
        let pairs: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.gene1.as_str(), r.gene2.as_str()))
            .collect();
        assert_eq!(pairs, vec![("B7H3", "DLL3"), ("B7H3", "FLAT"), ("DLL3", "FLAT")]);

        let first = &records[0];
        assert_eq!(first.n_samples, 5);
        assert_eq!(first.pearson_p, Some(0.0));
        assert!(records[1].pearson_r.is_none());
        assert!(records[1].spearman_p.is_none());
    }

    #[test]
    fn test_write_matrix_uses_na() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corr.tsv");
        let genes = GeneSet::parse_list("B7H3,FLAT").unwrap();
        write_correlation_matrix(&correlate(&matrix(), &genes).unwrap(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "gene\tB7H3\tFLAT\nB7H3\t1\tNA\nFLAT\tNA\t1\n");
    }

    #[test]
    fn test_write_pairwise_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.tsv");
        let genes = GeneSet::parse_list("B7H3,SEZ6").unwrap();
        write_pairwise_correlations(&pairwise_correlations(&matrix(), &genes).unwrap(), &path)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("gene1\tgene2\tpearson_r\tpearson_p\tspearman_r\tspearman_p\tn_samples")
        );
        assert!(lines.next().unwrap().starts_with("B7H3\tSEZ6\t-1\t0\t-1\t0\t5"));
    }
}
