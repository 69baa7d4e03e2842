//! Artifact staging and the run manifest.
//!
//! Stages write into a hidden staging directory inside the output directory.
//! Only when the whole mode has succeeded are the files renamed into place;
//! a dropped [`Staging`] removes everything it held, so a failed run leaves
//! the output directory as it found it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use oncoexpr_common::{OncoexprError, Result};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info};
use uuid::Uuid;

const STAGING_PREFIX: &str = ".oncoexpr-staging-";

pub struct Staging {
    dir: TempDir,
    output_dir: PathBuf,
}

impl Staging {
    /// Open a fresh staging directory under `output_dir`, which must exist.
    pub fn new(output_dir: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(output_dir)
            .map_err(|e| OncoexprError::io(output_dir, e))?;
        debug!(staging = %dir.path().display(), "Opened staging directory");
        Ok(Self {
            dir,
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Staging location for artifact `name`.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Move the named artifacts into the output directory, replacing any
    /// earlier files of the same name. Every name must have been written.
    pub fn commit(self, names: &[String]) -> Result<Vec<PathBuf>> {
        for name in names {
            let staged = self.file(name);
            if !staged.is_file() {
                return Err(OncoexprError::computation(format!(
                    "artifact {name} was not produced"
                )));
            }
        }

        let mut committed = Vec::with_capacity(names.len());
        for name in names {
            let dest = self.output_dir.join(name);
            std::fs::rename(self.file(name), &dest).map_err(|e| OncoexprError::io(&dest, e))?;
            committed.push(dest);
        }
        info!(
            output_dir = %self.output_dir.display(),
            n_artifacts = committed.len(),
            "Committed artifacts"
        );
        Ok(committed)
    }
}

/// Provenance record written beside every run's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub mode: String,
    pub project: Option<String>,
    pub parameters: serde_json::Value,
    /// Artifact file names, excluding the manifest itself.
    pub artifacts: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub version: String,
}

impl RunManifest {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n").map_err(|e| OncoexprError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| OncoexprError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncoexpr_test_utils::list_files;

    #[test]
    fn test_commit_moves_files_into_place() {
        let out = tempfile::tempdir().unwrap();
        let staging = Staging::new(out.path()).unwrap();
        std::fs::write(staging.file("a.tsv"), "x").unwrap();
        std::fs::write(staging.file("b.tsv"), "y").unwrap();

        let committed = staging.commit(&["a.tsv".to_string(), "b.tsv".to_string()]).unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(list_files(out.path()), vec!["a.tsv", "b.tsv"]);
    }

    #[test]
    fn test_dropped_staging_leaves_nothing() {
        let out = tempfile::tempdir().unwrap();
        {
            let staging = Staging::new(out.path()).unwrap();
            std::fs::write(staging.file("partial.tsv"), "x").unwrap();
        }
        assert!(list_files(out.path()).is_empty());
    }

    #[test]
    fn test_commit_requires_every_artifact() {
        let out = tempfile::tempdir().unwrap();
        let staging = Staging::new(out.path()).unwrap();
        std::fs::write(staging.file("a.tsv"), "x").unwrap();
        let err = staging
            .commit(&["a.tsv".to_string(), "missing.svg".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("missing.svg"));
        assert!(list_files(out.path()).is_empty());
    }

    #[test]
    fn test_commit_overwrites_previous_run() {
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("a.tsv"), "old").unwrap();
        let staging = Staging::new(out.path()).unwrap();
        std::fs::write(staging.file("a.tsv"), "new").unwrap();
        staging.commit(&["a.tsv".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(out.path().join("a.tsv")).unwrap(), "new");
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gbm_preprocess_manifest.json");
        let now = Utc::now();
        let manifest = RunManifest {
            run_id: Uuid::new_v4(),
            mode: "preprocess".into(),
            project: Some("gbm".into()),
            parameters: serde_json::json!({ "data_dir": "quant" }),
            artifacts: vec!["gbm_expression_matrix.tsv.gz".into()],
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            version: "0.1.0".into(),
        };
        manifest.write(&path).unwrap();
        assert_eq!(RunManifest::read(&path).unwrap(), manifest);
    }
}
