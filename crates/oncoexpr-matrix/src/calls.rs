//! Threshold classification of expression values into "expressed" calls.
//!
//! A gene is expressed in a sample iff its value is strictly greater than the
//! threshold. A value exactly equal to the threshold is NOT expressed; this
//! boundary changes counts at the margin and is covered by tests.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1};
use oncoexpr_common::{OncoexprError, Result};

use crate::matrix::{index_labels, ExpressionMatrix};

/// Default expression cutoff (TPM).
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Boolean expressed/not-expressed calls with the labels of the matrix they
/// were derived from. Carries the threshold so a call matrix can never be
/// confused with one derived at a different cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMatrix {
    calls: Array2<bool>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
    gene_index: HashMap<String, usize>,
    threshold: f64,
}

/// Classify every cell of `matrix` as `value > threshold`.
///
/// Pure: the same matrix and threshold always give the same calls.
pub fn classify(matrix: &ExpressionMatrix, threshold: f64) -> CallMatrix {
    let calls = matrix.values().mapv(|v| v > threshold);
    let gene_ids = matrix.gene_ids().to_vec();
    let gene_index = gene_ids
        .iter()
        .enumerate()
        .map(|(i, g)| (g.clone(), i))
        .collect();
    CallMatrix {
        calls,
        gene_ids,
        sample_ids: matrix.sample_ids().to_vec(),
        gene_index,
        threshold,
    }
}

impl CallMatrix {
    /// Build directly from boolean calls.
    pub fn from_parts(
        calls: Array2<bool>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
        threshold: f64,
    ) -> Result<Self> {
        let (n_genes, n_samples) = calls.dim();
        if gene_ids.len() != n_genes || sample_ids.len() != n_samples {
            return Err(OncoexprError::input(format!(
                "call matrix is {n_genes}x{n_samples} but has {} gene and {} sample labels",
                gene_ids.len(),
                sample_ids.len()
            )));
        }
        let gene_index = index_labels(&gene_ids, "gene")?;
        index_labels(&sample_ids, "sample")?;
        Ok(Self {
            calls,
            gene_ids,
            sample_ids,
            gene_index,
            threshold,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.calls.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.calls.ncols()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn row_index(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    /// Calls for the gene at row `index`.
    pub fn row(&self, index: usize) -> ArrayView1<'_, bool> {
        self.calls.row(index)
    }

    pub fn is_expressed(&self, gene: &str, sample: usize) -> Option<bool> {
        self.row_index(gene)
            .and_then(|g| self.calls.get([g, sample]).copied())
    }

    /// Number of samples in which `gene` is expressed.
    pub fn expressed_count(&self, gene: &str) -> Option<usize> {
        self.row_index(gene)
            .map(|g| self.calls.row(g).iter().filter(|&&c| c).count())
    }

    /// Marginal fraction of samples expressing `gene`; `None` for unknown
    /// genes or a matrix with no samples.
    pub fn expressed_fraction(&self, gene: &str) -> Option<f64> {
        if self.n_samples() == 0 {
            return None;
        }
        self.expressed_count(gene)
            .map(|n| n as f64 / self.n_samples() as f64)
    }
}
