//! Analysis stages for each oncoexpr mode.
//!
//! Every mode is a `Stage` registered in a [`StageRegistry`]. The dispatcher
//! looks the stage up by [`Mode`], hands it the validated parameters and a
//! staging directory, and commits whatever artifact names the stage returns.
//!
//! Stage lifecycle:
//!   1. Implement `Stage` for your type.
//!   2. Register with `StageRegistry::register`.
//!   3. The dispatcher calls `Stage::execute` once per run.

pub mod coexpression;
pub mod markers;
pub mod pathway;
pub mod preprocess;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use oncoexpr_common::{OncoexprError, Result};

use crate::config::Config;
use crate::dispatch::{Mode, ValidatedRun};

// ─────────────────────────────────────────────
//  Core trait
// ─────────────────────────────────────────────

/// One analysis mode.
///
/// `execute` writes its artifacts into `staging` and returns their file
/// names. It must not write anywhere else; the dispatcher owns the output
/// directory.
#[async_trait]
pub trait Stage: Send + Sync {
    /// The mode this stage serves. Unique across the registry.
    fn mode(&self) -> Mode;

    fn description(&self) -> &str;

    async fn execute(&self, run: &ValidatedRun, staging: &Path) -> Result<Vec<String>>;
}

// ─────────────────────────────────────────────
//  Stage registry
// ─────────────────────────────────────────────

pub struct StageRegistry {
    stages: HashMap<Mode, Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self { stages: HashMap::new() }
    }

    /// Register a stage. Panics if its mode is already taken.
    pub fn register<S: Stage + 'static>(&mut self, stage: S) {
        let mode = stage.mode();
        assert!(
            !self.stages.contains_key(&mode),
            "Duplicate stage for mode: {mode}"
        );
        self.stages.insert(mode, Arc::new(stage));
    }

    pub fn get(&self, mode: Mode) -> Option<&Arc<dyn Stage>> {
        self.stages.get(&mode)
    }

    pub fn len(&self) -> usize { self.stages.len() }

    pub fn is_empty(&self) -> bool { self.stages.is_empty() }
}

impl Default for StageRegistry {
    fn default() -> Self { Self::new() }
}

/// Registry with every built-in mode.
pub fn build_default_registry(config: &Config) -> StageRegistry {
    let mut reg = StageRegistry::new();
    reg.register(preprocess::PreprocessStage);
    reg.register(markers::MarkerAnalysisStage);
    reg.register(pathway::PathwayAnalysisStage);
    reg.register(coexpression::CoexpressionStage::new(config.heatmap.style()));
    tracing::debug!("StageRegistry ready with {} stages", reg.len());
    reg
}

/// Run CPU-bound work off the async executor.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| OncoexprError::computation(format!("analysis task aborted: {e}")))?
}

/// Error for a stage handed another mode's parameters.
pub(crate) fn wrong_params(mode: Mode) -> OncoexprError {
    OncoexprError::config(format!("{mode} stage received parameters for another mode"))
}

// ─────────────────────────────────────────────
//  Tests
// ─────────────────────────────────────────────
