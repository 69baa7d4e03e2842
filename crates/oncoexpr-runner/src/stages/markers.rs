//! Marker analysis: rank genes of a matrix, optionally case vs reference.

use std::path::Path;

use async_trait::async_trait;
use oncoexpr_common::naming::MARKER_TABLE;
use oncoexpr_common::Result;
use oncoexpr_matrix::{read_matrix, read_sample_groups};
use oncoexpr_stats::markers::write_marker_table;
use oncoexpr_stats::{rank_markers, GroupComparison};
use tracing::{info, instrument};

use super::{run_blocking, wrong_params, Stage};
use crate::dispatch::{Mode, ModeParams, ValidatedRun};

pub struct MarkerAnalysisStage;

#[async_trait]
impl Stage for MarkerAnalysisStage {
    fn mode(&self) -> Mode { Mode::MarkerAnalysis }

    fn description(&self) -> &str {
        "Rank genes by expression, or by Welch t-test between two sample groups, \
         and flag the top markers."
    }

    #[instrument(skip_all, fields(project = run.project.as_deref().unwrap_or("-")))]
    async fn execute(&self, run: &ValidatedRun, staging: &Path) -> Result<Vec<String>> {
        let ModeParams::MarkerAnalysis(params) = &run.params else {
            return Err(wrong_params(self.mode()));
        };
        let params = params.clone();
        let name = run.artifact(MARKER_TABLE);
        let dest = staging.join(&name);

        let n_markers = run_blocking(move || {
            let matrix = read_matrix(&params.input)?;
            let comparison = match &params.groups {
                Some(groups) => {
                    let labels = read_sample_groups(groups)?;
                    Some(GroupComparison::from_labels(
                        &matrix,
                        &labels,
                        params.case_group.as_deref(),
                    )?)
                }
                None => None,
            };
            let records = rank_markers(&matrix, &params.markers, comparison.as_ref())?;
            write_marker_table(&records, &dest)?;
            Ok(records.iter().filter(|r| r.is_marker).count())
        })
        .await?;

        info!(n_markers, artifact = %name, "Marker table written");
        Ok(vec![name])
    }
}
