//! Joint-expression statistics for every non-empty subset of a gene set.

use std::path::Path;

use ndarray::ArrayView1;
use oncoexpr_common::{GeneSet, OncoexprError, Result};
use oncoexpr_matrix::CallMatrix;
use serde::Serialize;
use tracing::{debug, info};

use crate::combinations::nonempty_subsets;
use crate::table;

/// Largest gene set whose power set is enumerated (2^20 − 1 records).
pub const MAX_SUBSET_GENES: usize = 20;

/// Co-expression count for one gene combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetStatistic {
    /// Subset members, in the order they appear in the requested gene set.
    pub genes: Vec<String>,
    pub num_expressing: usize,
    pub total_samples: usize,
    pub percentage: f64,
}

impl SubsetStatistic {
    /// `A+B+C` label used in the statistics table.
    pub fn combination(&self) -> String {
        self.genes.join("+")
    }

    pub fn size(&self) -> usize {
        self.genes.len()
    }
}

/// One record per non-empty subset of `genes`, size ascending, then
/// lexicographic over the input gene order.
///
/// A sample counts toward a subset only if every gene of the subset is
/// expressed in it.
pub fn compute_costats(calls: &CallMatrix, genes: &GeneSet) -> Result<Vec<SubsetStatistic>> {
    let total_samples = calls.n_samples();
    if total_samples == 0 {
        return Err(OncoexprError::input(
            "call matrix has no samples; co-expression percentages are undefined",
        ));
    }

    let missing: Vec<String> = genes
        .iter()
        .filter(|g| calls.row_index(g).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(OncoexprError::missing_genes(&missing));
    }

    if genes.len() > MAX_SUBSET_GENES {
        return Err(OncoexprError::config(format!(
            "{} genes requested; co-expression subsets are limited to {MAX_SUBSET_GENES} genes",
            genes.len()
        )));
    }

    let rows: Vec<ArrayView1<'_, bool>> = genes
        .iter()
        .filter_map(|g| calls.row_index(g))
        .map(|i| calls.row(i))
        .collect();

    let mut records = Vec::new();
    for subset in nonempty_subsets(rows.len()) {
        let num_expressing = (0..total_samples)
            .filter(|&s| subset.iter().all(|&g| rows[g][s]))
            .count();
        records.push(SubsetStatistic {
            genes: subset.iter().map(|&i| genes.as_slice()[i].clone()).collect(),
            num_expressing,
            total_samples,
            percentage: 100.0 * num_expressing as f64 / total_samples as f64,
        });
    }

    debug!(
        n_genes = genes.len(),
        n_records = records.len(),
        threshold = calls.threshold(),
        "Computed co-expression statistics"
    );
    Ok(records)
}

/// Write `records` as a TSV table:
/// `combination  num_expressing  total_samples  percentage`.
pub fn write_costats(records: &[SubsetStatistic], path: &Path) -> Result<()> {
    let mut writer = table::tsv_writer(path)?;
    table::write_row(
        &mut writer,
        path,
        ["combination", "num_expressing", "total_samples", "percentage"],
    )?;
    for record in records {
        table::write_row(
            &mut writer,
            path,
            [
                record.combination(),
                record.num_expressing.to_string(),
                record.total_samples.to_string(),
                table::fmt_value(record.percentage),
            ],
        )?;
    }
    table::finish(writer, path)?;
    info!(path = %path.display(), n_records = records.len(), "Wrote co-expression statistics");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use oncoexpr_common::ErrorKind;
    use oncoexpr_matrix::{classify, ExpressionMatrix};
    use pretty_assertions::assert_eq;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn scenario_calls() -> CallMatrix {
        // A=[T,T,F,T], B=[T,F,F,T], C=[T,T,T,T]
        let calls = Array2::from_shape_vec(
            (3, 4),
            vec![
                true, true, false, true, //
                true, false, false, true, //
                true, true, true, true,
            ],
        )
        .unwrap();
        CallMatrix::from_parts(
            calls,
            vec!["A".into(), "B".into(), "C".into()],
            labels("s", 4),
            1.0,
        )
        .unwrap()
    }

    fn find<'a>(records: &'a [SubsetStatistic], label: &str) -> &'a SubsetStatistic {
        records
            .iter()
            .find(|r| r.combination() == label)
            .unwrap_or_else(|| panic!("no record for {label}"))
    }

    #[test]
    fn test_scenario_percentages() {
        let genes = GeneSet::parse_list("A,B,C").unwrap();
        let records = compute_costats(&scenario_calls(), &genes).unwrap();

        let ab = find(&records, "A+B");
        assert_eq!((ab.num_expressing, ab.total_samples), (2, 4));
        assert_eq!(ab.percentage, 50.0);
        assert_eq!(find(&records, "A+B+C").percentage, 50.0);
        assert_eq!(find(&records, "C").percentage, 100.0);
        assert_eq!(find(&records, "A").percentage, 75.0);
    }

    #[test]
    fn test_record_order_is_size_then_input_order() {
        let genes = GeneSet::parse_list("C,A,B").unwrap();
        let records = compute_costats(&scenario_calls(), &genes).unwrap();
        let order: Vec<String> = records.iter().map(SubsetStatistic::combination).collect();
        assert_eq!(order, vec!["C", "A", "B", "C+A", "C+B", "A+B", "C+A+B"]);
    }

    #[test]
    fn test_record_count_is_power_set_minus_empty() {
        for n in 1..=10 {
            let genes = labels("G", n);
            let calls = CallMatrix::from_parts(
                Array2::from_shape_fn((n, 5), |(g, s)| (g + s) % 3 != 0),
                genes.clone(),
                labels("s", 5),
                1.0,
            )
            .unwrap();
            let set = GeneSet::new(genes).unwrap();
            let records = compute_costats(&calls, &set).unwrap();
            assert_eq!(records.len(), (1 << n) - 1, "n = {n}");
        }
    }

    #[test]
    fn test_percentage_never_grows_with_subset() {
        let n = 5;
        let genes = labels("G", n);
        let calls = CallMatrix::from_parts(
            Array2::from_shape_fn((n, 12), |(g, s)| (g * 7 + s * 3) % 5 < 3),
            genes.clone(),
            labels("s", 12),
            1.0,
        )
        .unwrap();
        let records = compute_costats(&calls, &GeneSet::new(genes).unwrap()).unwrap();

        for small in &records {
            for big in &records {
                if small.genes.iter().all(|g| big.genes.contains(g)) {
                    assert!(
                        big.percentage <= small.percentage,
                        "{} ({}) > {} ({})",
                        big.combination(),
                        big.percentage,
                        small.combination(),
                        small.percentage
                    );
                }
            }
        }
    }

    #[test]
    fn test_single_gene_matches_marginal_fraction() {
        let matrix = ExpressionMatrix::from_rows(
            &[
                ("DLL3", vec![0.0, 2.0, 5.0, 1.0, 9.0]),
                ("SEZ6", vec![3.0, 3.0, 0.5, 4.0, 0.0]),
            ],
            labels("s", 5),
        )
        .unwrap();
        let calls = classify(&matrix, 1.0);
        let genes = GeneSet::parse_list("DLL3,SEZ6").unwrap();
        let records = compute_costats(&calls, &genes).unwrap();
        for record in records.iter().filter(|r| r.size() == 1) {
            let fraction = calls.expressed_fraction(&record.genes[0]).unwrap();
            assert!((record.percentage - 100.0 * fraction).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_samples_is_input_error() {
        let calls = CallMatrix::from_parts(
            Array2::from_elem((2, 0), false),
            vec!["A".into(), "B".into()],
            vec![],
            1.0,
        )
        .unwrap();
        let err = compute_costats(&calls, &GeneSet::parse_list("A,B").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_missing_gene_is_configuration_error_naming_it() {
        let genes = GeneSet::parse_list("A,CD276,B").unwrap();
        let err = compute_costats(&scenario_calls(), &genes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("CD276"), "{err}");
    }

    #[test]
    fn test_oversized_gene_set_is_rejected() {
        let n = MAX_SUBSET_GENES + 1;
        let genes = labels("G", n);
        let calls = CallMatrix::from_parts(
            Array2::from_elem((n, 2), true),
            genes.clone(),
            labels("s", 2),
            1.0,
        )
        .unwrap();
        let err = compute_costats(&calls, &GeneSet::new(genes).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_write_costats_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gbm_coexpression_stats.tsv");
        let genes = GeneSet::parse_list("A,B").unwrap();
        let records = compute_costats(&scenario_calls(), &genes).unwrap();
        write_costats(&records, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "combination\tnum_expressing\ttotal_samples\tpercentage\n\
             A\t3\t4\t75\n\
             B\t2\t4\t50\n\
             A+B\t2\t4\t50\n"
        );
    }
}
