//! Mode dispatcher.
//!
//! A run moves through a small state machine:
//!
//! ```text
//! Idle ─▶ Validating ─▶ Preprocessing | MarkerAnalysis | PathwayAnalysis | CoexpressionAnalysis ─▶ Done
//!              │                               │
//!              └──────────────▶ Failed ◀───────┘
//! ```
//!
//! Validation turns a loosely typed [`RunRequest`] into a [`ValidatedRun`]
//! whose per-mode parameters carry every required path, so stages never
//! check for missing arguments themselves.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use oncoexpr_common::naming::{artifact_name, manifest_name, validate_project_id, EXPRESSION_MATRIX};
use oncoexpr_common::{GeneSet, OncoexprError, Result};
use oncoexpr_stats::MarkerParams;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::artifacts::{RunManifest, Staging};
use crate::config::Config;
use crate::stages::{build_default_registry, StageRegistry};

// ── Modes and states ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Preprocess,
    MarkerAnalysis,
    PathwayAnalysis,
    CoexpressionAnalysis,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Preprocess,
        Mode::MarkerAnalysis,
        Mode::PathwayAnalysis,
        Mode::CoexpressionAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Preprocess => "preprocess",
            Mode::MarkerAnalysis => "marker_analysis",
            Mode::PathwayAnalysis => "pathway_analysis",
            Mode::CoexpressionAnalysis => "coexpression_analysis",
        }
    }

    /// State the dispatcher occupies while this mode runs.
    pub fn active_state(&self) -> DispatchState {
        match self {
            Mode::Preprocess => DispatchState::Preprocessing,
            Mode::MarkerAnalysis => DispatchState::MarkerAnalysis,
            Mode::PathwayAnalysis => DispatchState::PathwayAnalysis,
            Mode::CoexpressionAnalysis => DispatchState::CoexpressionAnalysis,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = OncoexprError;

    fn from_str(s: &str) -> Result<Self> {
        let normalised = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalised.as_str() {
            "preprocess" => Ok(Mode::Preprocess),
            "marker_analysis" | "markers" => Ok(Mode::MarkerAnalysis),
            "pathway_analysis" | "pathway" => Ok(Mode::PathwayAnalysis),
            "coexpression_analysis" | "coexpression" | "co_expression" => {
                Ok(Mode::CoexpressionAnalysis)
            }
            _ => Err(OncoexprError::config(format!(
                "unknown mode {s:?}; expected one of {}",
                Mode::ALL.map(|m| m.as_str()).join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Validating,
    Preprocessing,
    MarkerAnalysis,
    PathwayAnalysis,
    CoexpressionAnalysis,
    Done,
    Failed,
}

impl DispatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchState::Done | DispatchState::Failed)
    }
}

// ── Requests ────────────────────────────────────────────────────────────────

/// Everything a caller may supply. Which fields are required depends on the
/// mode and is decided during validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRequest {
    pub mode: String,
    pub data_dir: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub project: Option<String>,
    pub genes: Vec<String>,
    pub threshold: Option<f64>,
    pub matrix: Option<PathBuf>,
    pub groups: Option<PathBuf>,
    pub case_group: Option<String>,
    pub gene_sets: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessParams {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerAnalysisParams {
    pub input: PathBuf,
    pub groups: Option<PathBuf>,
    pub case_group: Option<String>,
    pub markers: MarkerParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayAnalysisParams {
    pub input: PathBuf,
    pub gene_sets: Option<PathBuf>,
    pub top_n: usize,
    pub min_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoexpressionParams {
    pub genes: GeneSet,
    pub matrix: PathBuf,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModeParams {
    Preprocess(PreprocessParams),
    MarkerAnalysis(MarkerAnalysisParams),
    PathwayAnalysis(PathwayAnalysisParams),
    CoexpressionAnalysis(CoexpressionParams),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRun {
    pub mode: Mode,
    pub project: Option<String>,
    pub output_dir: PathBuf,
    pub params: ModeParams,
}

impl ValidatedRun {
    /// `<project>_<base>` or `<base>`.
    pub fn artifact(&self, base: &str) -> String {
        artifact_name(self.project.as_deref(), base)
    }

    pub fn manifest_name(&self) -> String {
        manifest_name(self.project.as_deref(), self.mode.as_str())
    }
}

fn required<T>(value: Option<T>, what: &str, mode: Mode) -> Result<T> {
    value.ok_or_else(|| OncoexprError::config(format!("{mode} requires {what}")))
}

/// Check `request` against the requirements of its mode.
/// Never touches the filesystem.
pub fn validate(request: &RunRequest, config: &Config) -> Result<ValidatedRun> {
    let mode: Mode = request.mode.parse()?;

    let threshold = request.threshold.unwrap_or(config.analysis.threshold);
    if !threshold.is_finite() {
        return Err(OncoexprError::config(format!(
            "threshold must be a finite number, got {threshold}"
        )));
    }

    let mut project = request.project.clone();
    let params = match mode {
        Mode::Preprocess => {
            let data_dir = required(request.data_dir.clone(), "a data directory (--data-dir)", mode)?;
            if project.is_none() {
                project = data_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .filter(|n| !n.is_empty());
            }
            ModeParams::Preprocess(PreprocessParams { data_dir })
        }
        Mode::MarkerAnalysis => ModeParams::MarkerAnalysis(MarkerAnalysisParams {
            input: required(request.input.clone(), "an input matrix (--input)", mode)?,
            groups: request.groups.clone(),
            case_group: request.case_group.clone(),
            markers: config.markers.params(threshold),
        }),
        Mode::PathwayAnalysis => ModeParams::PathwayAnalysis(PathwayAnalysisParams {
            input: required(request.input.clone(), "an input marker table (--input)", mode)?,
            gene_sets: request
                .gene_sets
                .clone()
                .or_else(|| config.pathway.gene_sets.clone()),
            top_n: config.pathway.top_n,
            min_overlap: config.pathway.min_overlap,
        }),
        Mode::CoexpressionAnalysis => {
            let project_id = required(project.as_deref(), "a project identifier (--project)", mode)?;
            if request.genes.iter().all(|g| g.trim().is_empty()) {
                return Err(OncoexprError::config(format!("{mode} requires a gene list (--genes)")));
            }
            let genes = GeneSet::new(&request.genes)?;
            if genes.len() > config.analysis.max_genes {
                return Err(OncoexprError::config(format!(
                    "{} genes requested; at most {} are allowed",
                    genes.len(),
                    config.analysis.max_genes
                )));
            }
            let output_dir = output_dir(request, config);
            let matrix = request.matrix.clone().unwrap_or_else(|| {
                output_dir.join(artifact_name(Some(project_id), EXPRESSION_MATRIX))
            });
            ModeParams::CoexpressionAnalysis(CoexpressionParams {
                genes,
                matrix,
                threshold,
            })
        }
    };

    if let Some(p) = &project {
        validate_project_id(p)?;
    }

    Ok(ValidatedRun {
        mode,
        project,
        output_dir: output_dir(request, config),
        params,
    })
}

fn output_dir(request: &RunRequest, config: &Config) -> PathBuf {
    request
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.dir.clone())
}

// ── Dispatcher ──────────────────────────────────────────────────────────────

/// Result of one dispatch. `state` is always terminal.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub state: DispatchState,
    /// Every state visited, starting at `Idle`.
    pub trail: Vec<DispatchState>,
    pub artifacts: Vec<PathBuf>,
    pub manifest: Option<RunManifest>,
    pub error: Option<OncoexprError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == DispatchState::Done
    }
}

struct Transitions {
    trail: Vec<DispatchState>,
}

impl Transitions {
    fn new() -> Self {
        Self {
            trail: vec![DispatchState::Idle],
        }
    }

    fn current(&self) -> DispatchState {
        self.trail.last().copied().unwrap_or(DispatchState::Idle)
    }

    fn to(&mut self, next: DispatchState) {
        tracing::debug!(from = ?self.current(), to = ?next, "State transition");
        self.trail.push(next);
    }
}

pub struct Dispatcher {
    config: Config,
    registry: StageRegistry,
}

impl Dispatcher {
    /// Dispatcher with every built-in stage registered.
    pub fn new(config: Config) -> Self {
        let registry = build_default_registry(&config);
        Self { config, registry }
    }

    pub fn with_registry(config: Config, registry: StageRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one request to a terminal state. Never retries.
    #[instrument(skip_all, fields(mode = %request.mode))]
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let mut states = Transitions::new();
        states.to(DispatchState::Validating);

        let run = match validate(&request, &self.config) {
            Ok(run) => run,
            Err(e) => {
                warn!(%run_id, error = %e, "Run request rejected");
                return Self::failed(run_id, states, e);
            }
        };
        states.to(run.mode.active_state());

        match self.execute(run_id, &run).await {
            Ok((artifacts, manifest)) => {
                states.to(DispatchState::Done);
                info!(
                    %run_id,
                    mode = %run.mode,
                    n_artifacts = artifacts.len(),
                    duration_ms = manifest.duration_ms,
                    "Run complete"
                );
                RunOutcome {
                    run_id,
                    state: DispatchState::Done,
                    trail: states.trail,
                    artifacts,
                    manifest: Some(manifest),
                    error: None,
                }
            }
            Err(e) => {
                error!(%run_id, mode = %run.mode, kind = %e.kind(), error = %e, "Run failed");
                Self::failed(run_id, states, e)
            }
        }
    }

    fn failed(run_id: Uuid, mut states: Transitions, error: OncoexprError) -> RunOutcome {
        states.to(DispatchState::Failed);
        RunOutcome {
            run_id,
            state: DispatchState::Failed,
            trail: states.trail,
            artifacts: Vec::new(),
            manifest: None,
            error: Some(error),
        }
    }

    async fn execute(&self, run_id: Uuid, run: &ValidatedRun) -> Result<(Vec<PathBuf>, RunManifest)> {
        let started_at = Utc::now();
        let clock = Instant::now();

        ensure_output_dir(&run.output_dir)?;
        let staging = Staging::new(&run.output_dir)?;

        let stage = self.registry.get(run.mode).ok_or_else(|| {
            OncoexprError::config(format!("no stage registered for {}", run.mode))
        })?;
        info!(%run_id, mode = %run.mode, stage = stage.description(), "Starting stage");
        let mut artifacts = stage.execute(run, staging.path()).await?;

        let manifest = RunManifest {
            run_id,
            mode: run.mode.as_str().to_string(),
            project: run.project.clone(),
            parameters: serde_json::to_value(&run.params)?,
            artifacts: artifacts.clone(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let manifest_file = run.manifest_name();
        manifest.write(&staging.file(&manifest_file))?;
        artifacts.push(manifest_file);

        let committed = staging.commit(&artifacts)?;
        Ok((committed, manifest))
    }
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        OncoexprError::input(format!(
            "cannot create output directory {}: {e}",
            dir.display()
        ))
    })
}
