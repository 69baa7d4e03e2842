//! Co-expression analysis over a target gene set.
//!
//! Always writes the subset statistics table. For two or more genes it also
//! writes the Pearson matrix, the pairwise Pearson/Spearman table and the
//! heatmap.

use std::path::Path;

use async_trait::async_trait;
use oncoexpr_common::naming::{
    COEXPRESSION_STATS, CORRELATION_HEATMAP, CORRELATION_MATRIX, PAIRWISE_CORRELATIONS,
};
use oncoexpr_common::Result;
use oncoexpr_matrix::{classify, read_matrix};
use oncoexpr_stats::correlation::{write_correlation_matrix, write_pairwise_correlations};
use oncoexpr_stats::costats::write_costats;
use oncoexpr_stats::{compute_costats, correlate, pairwise_correlations, render_heatmap, HeatmapStyle};
use tracing::{info, instrument};

use super::{run_blocking, wrong_params, Stage};
use crate::dispatch::{Mode, ModeParams, ValidatedRun};

pub struct CoexpressionStage {
    style: HeatmapStyle,
}

impl CoexpressionStage {
    pub fn new(style: HeatmapStyle) -> Self { Self { style } }
}

#[async_trait]
impl Stage for CoexpressionStage {
    fn mode(&self) -> Mode { Mode::CoexpressionAnalysis }

    fn description(&self) -> &str {
        "Joint expression percentages for every gene subset, plus gene-gene correlation \
         and a heatmap."
    }

    #[instrument(skip_all, fields(project = run.project.as_deref().unwrap_or("-")))]
    async fn execute(&self, run: &ValidatedRun, staging: &Path) -> Result<Vec<String>> {
        let ModeParams::CoexpressionAnalysis(params) = &run.params else {
            return Err(wrong_params(self.mode()));
        };
        let params = params.clone();
        let style = self.style.clone();
        let names = [
            COEXPRESSION_STATS,
            CORRELATION_MATRIX,
            PAIRWISE_CORRELATIONS,
            CORRELATION_HEATMAP,
        ]
        .map(|base| run.artifact(base));
        let paths = names.clone().map(|n| staging.join(n));

        let with_correlation = run_blocking(move || {
            let matrix = read_matrix(&params.matrix)?;
            let calls = classify(&matrix, params.threshold);
            let stats = compute_costats(&calls, &params.genes)?;
            write_costats(&stats, &paths[0])?;

            if params.genes.len() < 2 {
                info!(
                    gene = %params.genes.label(&[0]),
                    "Single target gene; skipping correlation outputs"
                );
                return Ok(false);
            }

            let corr = correlate(&matrix, &params.genes)?;
            let pairs = pairwise_correlations(&matrix, &params.genes)?;
            write_correlation_matrix(&corr, &paths[1])?;
            write_pairwise_correlations(&pairs, &paths[2])?;
            render_heatmap(&corr, &paths[3], &style)?;
            Ok(true)
        })
        .await?;

        let written: Vec<String> = if with_correlation {
            names.to_vec()
        } else {
            names[..1].to_vec()
        };
        info!(n_artifacts = written.len(), "Co-expression analysis written");
        Ok(written)
    }
}
