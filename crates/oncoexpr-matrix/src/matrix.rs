//! Expression matrix representation.
//! Rows are genes, columns are samples.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use oncoexpr_common::{GeneSet, OncoexprError, Result};

/// Map labels to their positions, rejecting empty and repeated labels.
pub(crate) fn index_labels(labels: &[String], what: &str) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        if label.trim().is_empty() {
            return Err(OncoexprError::input(format!("{what} label at position {i} is empty")));
        }
        if index.insert(label.clone(), i).is_some() {
            return Err(OncoexprError::input(format!("duplicate {what} label: {label}")));
        }
    }
    Ok(index)
}

/// Normalised expression values (e.g. TPM) for a cohort.
///
/// Created once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    /// Expression values (genes x samples)
    values: Array2<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
    /// gene id -> row
    gene_index: HashMap<String, usize>,
}

impl ExpressionMatrix {
    /// Build a matrix, checking shape, label uniqueness and that every value
    /// is a finite, non-negative number.
    pub fn new(values: Array2<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (n_genes, n_samples) = values.dim();

        if gene_ids.len() != n_genes {
            return Err(OncoexprError::input(format!(
                "expected {n_genes} gene ids, got {}",
                gene_ids.len()
            )));
        }
        if sample_ids.len() != n_samples {
            return Err(OncoexprError::input(format!(
                "expected {n_samples} sample ids, got {}",
                sample_ids.len()
            )));
        }

        let gene_index = index_labels(&gene_ids, "gene")?;
        index_labels(&sample_ids, "sample")?;

        if let Some(((g, s), v)) = values
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(OncoexprError::input(format!(
                "invalid expression value {v} for gene {} in sample {}",
                gene_ids[g], sample_ids[s]
            )));
        }

        Ok(Self {
            values,
            gene_ids,
            sample_ids,
            gene_index,
        })
    }

    /// Convenience constructor from per-gene rows.
    pub fn from_rows<S: AsRef<str>>(rows: &[(S, Vec<f64>)], sample_ids: Vec<String>) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut values = Array2::zeros((rows.len(), n_samples));
        let mut gene_ids = Vec::with_capacity(rows.len());
        for (i, (gene, row)) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(OncoexprError::input(format!(
                    "row for gene {} has {} values, expected {n_samples}",
                    gene.as_ref(),
                    row.len()
                )));
            }
            for (j, v) in row.iter().enumerate() {
                values[[i, j]] = *v;
            }
            gene_ids.push(gene.as_ref().to_string());
        }
        Self::new(values, gene_ids, sample_ids)
    }

    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row_index(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn has_gene(&self, gene: &str) -> bool {
        self.gene_index.contains_key(gene)
    }

    /// Expression profile of one gene across all samples.
    pub fn gene_row(&self, gene: &str) -> Option<ArrayView1<'_, f64>> {
        self.row_index(gene).map(|i| self.values.row(i))
    }

    /// Requested genes that are not rows of this matrix, in request order.
    pub fn missing_genes(&self, genes: &GeneSet) -> Vec<String> {
        genes
            .iter()
            .filter(|g| !self.has_gene(g))
            .cloned()
            .collect()
    }

    /// Sub-matrix with exactly the requested genes, in gene-set order.
    /// Fails naming every gene the matrix lacks.
    pub fn restrict(&self, genes: &GeneSet) -> Result<ExpressionMatrix> {
        let missing = self.missing_genes(genes);
        if !missing.is_empty() {
            return Err(OncoexprError::missing_genes(&missing));
        }
        let rows: Vec<usize> = genes.iter().filter_map(|g| self.row_index(g)).collect();
        let values = self.values.select(Axis(0), &rows);
        Self::new(values, genes.as_slice().to_vec(), self.sample_ids.clone())
    }
}
