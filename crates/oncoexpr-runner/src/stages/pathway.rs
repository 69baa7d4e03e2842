//! Pathway analysis: over-representation of marker genes in gene sets.

use std::path::Path;

use async_trait::async_trait;
use oncoexpr_common::naming::ENRICHMENT_TABLE;
use oncoexpr_common::Result;
use oncoexpr_stats::enrichment::{read_gene_table, write_enrichment_table};
use oncoexpr_stats::{over_representation, GeneSetLibrary};
use tracing::{info, instrument};

use super::{run_blocking, wrong_params, Stage};
use crate::dispatch::{Mode, ModeParams, ValidatedRun};

pub struct PathwayAnalysisStage;

#[async_trait]
impl Stage for PathwayAnalysisStage {
    fn mode(&self) -> Mode { Mode::PathwayAnalysis }

    fn description(&self) -> &str {
        "Hypergeometric over-representation of marker genes in pathway gene sets, BH-adjusted."
    }

    #[instrument(skip_all, fields(project = run.project.as_deref().unwrap_or("-")))]
    async fn execute(&self, run: &ValidatedRun, staging: &Path) -> Result<Vec<String>> {
        let ModeParams::PathwayAnalysis(params) = &run.params else {
            return Err(wrong_params(self.mode()));
        };
        let params = params.clone();
        let name = run.artifact(ENRICHMENT_TABLE);
        let dest = staging.join(&name);

        let (library, n_reported) = run_blocking(move || {
            let table = read_gene_table(&params.input, params.top_n)?;
            let library = match &params.gene_sets {
                Some(gmt) => GeneSetLibrary::from_gmt(gmt)?,
                None => GeneSetLibrary::builtin(),
            };
            let records =
                over_representation(&table.query, &table.universe, &library, params.min_overlap)?;
            write_enrichment_table(&records, &dest)?;
            Ok((library.name().to_string(), records.len()))
        })
        .await?;

        info!(library = %library, n_reported, artifact = %name, "Enrichment table written");
        Ok(vec![name])
    }
}
