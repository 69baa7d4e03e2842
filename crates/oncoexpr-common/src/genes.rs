//! Target gene sets.
//!
//! A `GeneSet` is the caller-supplied, ordered list of genes an analysis is
//! about. Order matters: it fixes the enumeration order of gene combinations
//! and the row/column order of correlation outputs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{OncoexprError, Result};

/// Ordered, deduplicated, non-empty list of gene identifiers.
///
/// Identifiers are compared exactly (no case folding) so Ensembl IDs and
/// symbols pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct GeneSet(Vec<String>);

impl GeneSet {
    /// Build from any list of identifiers. Blank entries are ignored and
    /// repeats keep their first position.
    pub fn new<I, S>(genes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for gene in genes {
            let gene = gene.as_ref().trim();
            if gene.is_empty() {
                continue;
            }
            if seen.insert(gene.to_string()) {
                ordered.push(gene.to_string());
            }
        }
        if ordered.is_empty() {
            return Err(OncoexprError::config("gene list is empty"));
        }
        Ok(Self(ordered))
    }

    /// Parse a comma-separated list such as `"DLL3, SEZ6,CD276"`.
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::new(list.split(','))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Join the genes at `indices` with `+`, in the order given.
    pub fn label(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .map(|&i| self.0[i].as_str())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl TryFrom<Vec<String>> for GeneSet {
    type Error = OncoexprError;

    fn try_from(genes: Vec<String>) -> Result<Self> {
        Self::new(genes)
    }
}

impl From<GeneSet> for Vec<String> {
    fn from(set: GeneSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a GeneSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
