//! Deterministic artifact file names.
//!
//! Every output file is `<prefix><base>`, where the prefix is `"<project>_"`
//! when a project identifier is known and empty otherwise.

use crate::error::{OncoexprError, Result};

pub const EXPRESSION_MATRIX: &str = "expression_matrix.tsv.gz";
pub const MARKER_TABLE: &str = "marker_genes.tsv";
pub const ENRICHMENT_TABLE: &str = "pathway_enrichment.tsv";
pub const COEXPRESSION_STATS: &str = "coexpression_stats.tsv";
pub const CORRELATION_MATRIX: &str = "correlation_matrix.tsv";
pub const PAIRWISE_CORRELATIONS: &str = "pairwise_correlations.tsv";
pub const CORRELATION_HEATMAP: &str = "correlation_heatmap.svg";

/// Reject project identifiers that would escape the output directory or
/// produce an unreadable file name.
pub fn validate_project_id(project: &str) -> Result<()> {
    let trimmed = project.trim();
    if trimmed.is_empty() {
        return Err(OncoexprError::config("project identifier is empty"));
    }
    if trimmed != project {
        return Err(OncoexprError::config(format!(
            "project identifier {project:?} has surrounding whitespace"
        )));
    }
    if project
        .chars()
        .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
        || project == "."
        || project == ".."
    {
        return Err(OncoexprError::config(format!(
            "project identifier {project:?} contains path characters"
        )));
    }
    Ok(())
}

pub fn artifact_name(project: Option<&str>, base: &str) -> String {
    match project {
        Some(p) => format!("{p}_{base}"),
        None => base.to_string(),
    }
}

/// `<prefix><mode>_manifest.json`
pub fn manifest_name(project: Option<&str>, mode: &str) -> String {
    artifact_name(project, &format!("{mode}_manifest.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_name_with_and_without_project() {
        assert_eq!(
            artifact_name(Some("TCGA-GBM"), COEXPRESSION_STATS),
            "TCGA-GBM_coexpression_stats.tsv"
        );
        assert_eq!(artifact_name(None, MARKER_TABLE), "marker_genes.tsv");
        assert_eq!(
            manifest_name(Some("TCGA-GBM"), "preprocess"),
            "TCGA-GBM_preprocess_manifest.json"
        );
    }

    #[test]
    fn test_project_id_rejects_paths() {
        assert!(validate_project_id("TCGA-GBM").is_ok());
        assert!(validate_project_id("../etc").is_err());
        assert!(validate_project_id("a/b").is_err());
        assert!(validate_project_id("").is_err());
        assert!(validate_project_id(" TCGA").is_err());
    }
}
