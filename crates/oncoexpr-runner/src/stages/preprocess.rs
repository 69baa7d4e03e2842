//! Preprocess: merge per-sample quantification files into one cohort matrix.

use std::path::Path;

use async_trait::async_trait;
use oncoexpr_common::naming::EXPRESSION_MATRIX;
use oncoexpr_common::Result;
use oncoexpr_matrix::{assemble_from_dir, write_matrix};
use tracing::{info, instrument};

use super::{run_blocking, wrong_params, Stage};
use crate::dispatch::{Mode, ModeParams, ValidatedRun};

pub struct PreprocessStage;

#[async_trait]
impl Stage for PreprocessStage {
    fn mode(&self) -> Mode { Mode::Preprocess }

    fn description(&self) -> &str {
        "Assemble per-sample quantification files into a gzip-compressed gene x sample matrix."
    }

    #[instrument(skip_all, fields(project = run.project.as_deref().unwrap_or("-")))]
    async fn execute(&self, run: &ValidatedRun, staging: &Path) -> Result<Vec<String>> {
        let ModeParams::Preprocess(params) = &run.params else {
            return Err(wrong_params(self.mode()));
        };
        let data_dir = params.data_dir.clone();
        let name = run.artifact(EXPRESSION_MATRIX);
        let dest = staging.join(&name);

        let (n_genes, n_samples) = run_blocking(move || {
            let matrix = assemble_from_dir(&data_dir)?;
            write_matrix(&matrix, &dest)?;
            Ok((matrix.n_genes(), matrix.n_samples()))
        })
        .await?;

        info!(n_genes, n_samples, artifact = %name, "Expression matrix written");
        Ok(vec![name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::PreprocessParams;
    use oncoexpr_common::ErrorKind;
    use oncoexpr_matrix::read_matrix;
    use oncoexpr_test_utils::CohortFixture;

    fn run_for(data_dir: &Path) -> ValidatedRun {
        ValidatedRun {
            mode: Mode::Preprocess,
            project: Some("gbm".into()),
            output_dir: data_dir.to_path_buf(),
            params: ModeParams::Preprocess(PreprocessParams {
                data_dir: data_dir.to_path_buf(),
            }),
        }
    }

    #[tokio::test]
    async fn test_writes_cohort_matrix() {
        let fixture = CohortFixture::gbm();
        let staging = tempfile::tempdir().unwrap();

        let names = PreprocessStage
            .execute(&run_for(&fixture.data_dir()), staging.path())
            .await
            .unwrap();
        assert_eq!(names, vec!["gbm_expression_matrix.tsv.gz"]);

        let matrix = read_matrix(&staging.path().join(&names[0])).unwrap();
        assert_eq!(matrix.n_samples(), 4);
        assert_eq!(matrix.gene_ids(), &["ACTB", "CD276", "DLL3", "GAPDH", "SEZ6"]);
        // GAPDH is absent from sample 03 and filled with zero.
        assert_eq!(matrix.gene_row("GAPDH").unwrap()[2], 0.0);
    }

    #[tokio::test]
    async fn test_empty_data_dir_is_input_error() {
        let fixture = CohortFixture::new();
        std::fs::create_dir_all(fixture.data_dir()).unwrap();
        let staging = tempfile::tempdir().unwrap();

        let err = PreprocessStage
            .execute(&run_for(&fixture.data_dir()), staging.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
