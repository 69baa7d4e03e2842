//! Configuration loading for oncoexpr.
//! Reads an optional TOML file: `--config`, then the path in ONCOEXPR_CONFIG,
//! then `oncoexpr.toml` in the current directory.

use std::path::{Path, PathBuf};

use oncoexpr_common::{OncoexprError, Result};
use oncoexpr_stats::{HeatmapStyle, MarkerParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_ENV: &str = "ONCOEXPR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "oncoexpr.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    #[serde(default)]
    pub markers: MarkersConfig,
    #[serde(default)]
    pub pathway: PathwayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Largest gene list accepted for co-expression subsets.
    #[serde(default = "default_max_genes")]
    pub max_genes: usize,
}

fn default_threshold() -> f64 { oncoexpr_matrix::DEFAULT_THRESHOLD }
fn default_max_genes() -> usize { oncoexpr_stats::MAX_SUBSET_GENES }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_genes: default_max_genes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf { PathBuf::from("results") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatmapConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_annotate")]
    pub annotate: bool,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 700 }
fn default_annotate() -> bool { true }
fn default_title() -> String { "Gene Co-expression Correlation Matrix".to_string() }

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            annotate: default_annotate(),
            title: default_title(),
        }
    }
}

impl HeatmapConfig {
    pub fn style(&self) -> HeatmapStyle {
        HeatmapStyle {
            width: self.width,
            height: self.height,
            annotate: self.annotate,
            title: self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkersConfig {
    #[serde(default = "default_marker_top_n")]
    pub top_n: usize,
    #[serde(default = "default_fdr")]
    pub fdr: f64,
    #[serde(default = "default_min_lfc")]
    pub min_log2_fold_change: f64,
}

fn default_marker_top_n() -> usize { 50 }
fn default_fdr() -> f64 { 0.05 }
fn default_min_lfc() -> f64 { 1.0 }

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            top_n: default_marker_top_n(),
            fdr: default_fdr(),
            min_log2_fold_change: default_min_lfc(),
        }
    }
}

impl MarkersConfig {
    pub fn params(&self, threshold: f64) -> MarkerParams {
        MarkerParams {
            threshold,
            top_n: self.top_n,
            fdr: self.fdr,
            min_log2_fold_change: self.min_log2_fold_change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathwayConfig {
    /// GMT file; the built-in library is used when unset.
    #[serde(default)]
    pub gene_sets: Option<PathBuf>,
    #[serde(default = "default_pathway_top_n")]
    pub top_n: usize,
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
}

fn default_pathway_top_n() -> usize { 100 }
fn default_min_overlap() -> usize { 2 }

impl Default for PathwayConfig {
    fn default() -> Self {
        Self {
            gene_sets: None,
            top_n: default_pathway_top_n(),
            min_overlap: default_min_overlap(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicitly named file (argument or ONCOEXPR_CONFIG) must exist. A
    /// missing `./oncoexpr.toml` means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match named {
            Some(path) => Self::from_file(&path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    debug!("No {DEFAULT_CONFIG_FILE} found; using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OncoexprError::config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            OncoexprError::Configuration(msg) => {
                OncoexprError::config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| OncoexprError::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.analysis.threshold.is_finite() {
            return Err(OncoexprError::config("analysis.threshold must be finite"));
        }
        if self.analysis.max_genes == 0 || self.analysis.max_genes > oncoexpr_stats::MAX_SUBSET_GENES {
            return Err(OncoexprError::config(format!(
                "analysis.max_genes must be between 1 and {}",
                oncoexpr_stats::MAX_SUBSET_GENES
            )));
        }
        if !(0.0..=1.0).contains(&self.markers.fdr) {
            return Err(OncoexprError::config("markers.fdr must be within [0, 1]"));
        }
        if self.heatmap.width < 200 || self.heatmap.height < 200 {
            return Err(OncoexprError::config("heatmap width and height must be at least 200"));
        }
        Ok(())
    }
}
