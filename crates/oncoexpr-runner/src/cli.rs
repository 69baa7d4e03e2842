//! Command-line surface of the `oncoexpr` binary.
//!
//! Every mode parameter is optional here; the dispatcher decides which ones a
//! mode needs.

use std::path::PathBuf;

use clap::Parser;

use crate::dispatch::RunRequest;

#[derive(Parser, Debug)]
#[command(
    name = "oncoexpr",
    author,
    version,
    about = "Tumour cohort gene expression analysis: matrix assembly, markers, pathways and co-expression"
)]
pub struct Cli {
    /// preprocess | marker_analysis | pathway_analysis | coexpression_analysis
    #[arg(short, long)]
    pub mode: String,

    /// Directory of per-sample quantification files (preprocess)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Input matrix (marker_analysis) or marker table (pathway_analysis)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Project identifier used as the artifact name prefix
    #[arg(short, long)]
    pub project: Option<String>,

    /// Comma-separated target genes, e.g. DLL3,SEZ6,CD276
    #[arg(short, long, value_delimiter = ',')]
    pub genes: Vec<String>,

    /// Expression threshold; a value must exceed it to count as expressed
    #[arg(short, long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Expression matrix for co-expression analysis
    #[arg(long)]
    pub matrix: Option<PathBuf>,

    /// Sample-to-group table for marker analysis
    #[arg(long)]
    pub groups: Option<PathBuf>,

    /// Group treated as the case in marker analysis
    #[arg(long)]
    pub case_group: Option<String>,

    /// GMT gene-set file for pathway analysis
    #[arg(long)]
    pub gene_sets: Option<PathBuf>,

    /// Output directory [default: from config, else "results"]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Configuration file [default: $ONCOEXPR_CONFIG, else ./oncoexpr.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// More log output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when RUST_LOG is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "oncoexpr=trace,debug"
        } else {
            "oncoexpr=debug,info"
        }
    }

    pub fn into_request(self) -> RunRequest {
        RunRequest {
            mode: self.mode,
            data_dir: self.data_dir,
            input: self.input,
            project: self.project,
            genes: self.genes,
            threshold: self.threshold,
            matrix: self.matrix,
            groups: self.groups,
            case_group: self.case_group,
            gene_sets: self.gene_sets,
            output_dir: self.output_dir,
        }
    }
}
