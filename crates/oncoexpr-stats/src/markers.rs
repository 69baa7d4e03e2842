//! Marker gene ranking.
//!
//! Two regimes:
//! - no sample groups: genes are ranked by how broadly they are expressed
//!   (fraction of samples above threshold, then mean TPM);
//! - two sample groups: differential expression of log2(TPM + 1) between a
//!   case and a reference group, Welch t-test, BH-adjusted.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use oncoexpr_common::{OncoexprError, Result};
use oncoexpr_matrix::{classify, ExpressionMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fdr::benjamini_hochberg;
use crate::pvalue::{mean_var, welch_t_test};
use crate::table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerParams {
    /// Expression cutoff for `expressed_fraction`.
    pub threshold: f64,
    pub top_n: usize,
    pub fdr: f64,
    pub min_log2_fold_change: f64,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            threshold: oncoexpr_matrix::DEFAULT_THRESHOLD,
            top_n: 50,
            fdr: 0.05,
            min_log2_fold_change: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub gene: String,
    pub mean: f64,
    pub median: f64,
    pub sd: f64,
    pub expressed_fraction: f64,
    pub log2_fold_change: Option<f64>,
    pub pvalue: Option<f64>,
    pub padj: Option<f64>,
    /// 1-based.
    pub rank: usize,
    pub is_marker: bool,
}

/// Case-vs-reference split of the matrix columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupComparison {
    pub case: String,
    pub reference: String,
    pub case_samples: Vec<usize>,
    pub reference_samples: Vec<usize>,
}

impl GroupComparison {
    /// Resolve sample labels against `matrix`.
    ///
    /// Every matrix sample must carry a label, and exactly two distinct
    /// labels must occur. Without an explicit `case`, the labels are sorted
    /// and the second one is the case.
    pub fn from_labels(
        matrix: &ExpressionMatrix,
        labels: &[(String, String)],
        case: Option<&str>,
    ) -> Result<Self> {
        let by_sample: HashMap<&str, &str> = labels
            .iter()
            .map(|(s, g)| (s.as_str(), g.as_str()))
            .collect();

        let unlabelled: Vec<&str> = matrix
            .sample_ids()
            .iter()
            .map(String::as_str)
            .filter(|s| !by_sample.contains_key(s))
            .collect();
        if !unlabelled.is_empty() {
            return Err(OncoexprError::input(format!(
                "{} matrix sample(s) have no group label: {}",
                unlabelled.len(),
                unlabelled.join(", ")
            )));
        }
        let extra = labels.len().saturating_sub(matrix.n_samples());
        if extra > 0 {
            warn!(extra, "Group labels for samples not in the matrix are ignored");
        }

        let groups: BTreeSet<&str> = matrix
            .sample_ids()
            .iter()
            .filter_map(|s| by_sample.get(s.as_str()).copied())
            .collect();
        if groups.len() != 2 {
            return Err(OncoexprError::config(format!(
                "marker comparison needs exactly 2 sample groups, found {}: {}",
                groups.len(),
                groups.iter().copied().collect::<Vec<_>>().join(", ")
            )));
        }
        let sorted: Vec<&str> = groups.into_iter().collect();
        let (case, reference) = match case {
            Some(c) if c == sorted[0] => (sorted[0], sorted[1]),
            Some(c) if c == sorted[1] => (sorted[1], sorted[0]),
            Some(c) => {
                return Err(OncoexprError::config(format!(
                    "case group {c:?} is not one of {} / {}",
                    sorted[0], sorted[1]
                )))
            }
            None => (sorted[1], sorted[0]),
        };

        let members = |group: &str| -> Vec<usize> {
            matrix
                .sample_ids()
                .iter()
                .enumerate()
                .filter(|(_, s)| by_sample.get(s.as_str()) == Some(&group))
                .map(|(i, _)| i)
                .collect()
        };
        Ok(Self {
            case: case.to_string(),
            reference: reference.to_string(),
            case_samples: members(case),
            reference_samples: members(reference),
        })
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn cmp_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// `None` sorts after every value.
fn cmp_asc_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a.filter(|v| v.is_finite()), b.filter(|v| v.is_finite())) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank every gene of `matrix`. Records come back in rank order.
pub fn rank_markers(
    matrix: &ExpressionMatrix,
    params: &MarkerParams,
    comparison: Option<&GroupComparison>,
) -> Result<Vec<MarkerRecord>> {
    if matrix.n_samples() == 0 {
        return Err(OncoexprError::input("expression matrix has no samples"));
    }
    if matrix.n_genes() == 0 {
        return Err(OncoexprError::input("expression matrix has no genes"));
    }
    if let Some(cmp) = comparison {
        if cmp.case_samples.len() < 2 || cmp.reference_samples.len() < 2 {
            return Err(OncoexprError::computation(format!(
                "differential test needs at least 2 samples per group ({} {}, {} {})",
                cmp.case,
                cmp.case_samples.len(),
                cmp.reference,
                cmp.reference_samples.len()
            )));
        }
    }

    let calls = classify(matrix, params.threshold);
    let values = matrix.values();
    let mut records: Vec<MarkerRecord> = matrix
        .gene_ids()
        .iter()
        .zip(values.rows())
        .map(|(gene, row)| {
            let row = row.to_vec();
            let (mean, var) = mean_var(&row);
            MarkerRecord {
                gene: gene.clone(),
                mean,
                median: median(&row),
                sd: var.sqrt(),
                expressed_fraction: calls.expressed_fraction(gene).unwrap_or(0.0),
                log2_fold_change: None,
                pvalue: None,
                padj: None,
                rank: 0,
                is_marker: false,
            }
        })
        .collect();

    match comparison {
        None => {
            records.sort_by(|a, b| {
                cmp_desc(a.expressed_fraction, b.expressed_fraction)
                    .then_with(|| cmp_desc(a.mean, b.mean))
                    .then_with(|| a.gene.cmp(&b.gene))
            });
            for (i, record) in records.iter_mut().enumerate() {
                record.rank = i + 1;
                record.is_marker = i < params.top_n && record.expressed_fraction > 0.0;
            }
        }
        Some(cmp) => {
            for (record, row) in records.iter_mut().zip(values.rows()) {
                let log = |idx: &[usize]| -> Vec<f64> {
                    idx.iter().map(|&s| (row[s] + 1.0).log2()).collect()
                };
                let case = log(&cmp.case_samples);
                let reference = log(&cmp.reference_samples);
                record.log2_fold_change = Some(mean_var(&case).0 - mean_var(&reference).0);
                record.pvalue = welch_t_test(&case, &reference).map(|(_, _, p)| p);
            }

            let pvalues: Vec<f64> = records
                .iter()
                .map(|r| r.pvalue.unwrap_or(f64::NAN))
                .collect();
            for (record, padj) in records.iter_mut().zip(benjamini_hochberg(&pvalues)) {
                record.padj = padj.is_finite().then_some(padj);
            }

            records.sort_by(|a, b| {
                cmp_asc_missing_last(a.padj, b.padj)
                    .then_with(|| {
                        let fa = a.log2_fold_change.map_or(0.0, f64::abs);
                        let fb = b.log2_fold_change.map_or(0.0, f64::abs);
                        cmp_desc(fa, fb)
                    })
                    .then_with(|| a.gene.cmp(&b.gene))
            });
            let mut selected = 0;
            for (i, record) in records.iter_mut().enumerate() {
                record.rank = i + 1;
                let passes = record.padj.is_some_and(|p| p <= params.fdr)
                    && record
                        .log2_fold_change
                        .is_some_and(|lfc| lfc >= params.min_log2_fold_change);
                record.is_marker = passes && selected < params.top_n;
                if record.is_marker {
                    selected += 1;
                }
            }
        }
    }

    debug!(
        n_genes = records.len(),
        n_markers = records.iter().filter(|r| r.is_marker).count(),
        grouped = comparison.is_some(),
        "Ranked marker genes"
    );
    Ok(records)
}

pub fn write_marker_table(records: &[MarkerRecord], path: &Path) -> Result<()> {
    let mut writer = table::tsv_writer(path)?;
    table::write_row(
        &mut writer,
        path,
        [
            "gene",
            "mean",
            "median",
            "sd",
            "expressed_fraction",
            "log2_fold_change",
            "pvalue",
            "padj",
            "rank",
            "is_marker",
        ],
    )?;
    for r in records {
        table::write_row(
            &mut writer,
            path,
            [
                r.gene.clone(),
                table::fmt_value(r.mean),
                table::fmt_value(r.median),
                table::fmt_value(r.sd),
                table::fmt_value(r.expressed_fraction),
                table::fmt_opt(r.log2_fold_change),
                table::fmt_opt(r.pvalue),
                table::fmt_opt(r.padj),
                r.rank.to_string(),
                r.is_marker.to_string(),
            ],
        )?;
    }
    table::finish(writer, path)?;
    info!(
        path = %path.display(),
        n_genes = records.len(),
        n_markers = records.iter().filter(|r| r.is_marker).count(),
        "Wrote marker table"
    );
    Ok(())
}
