//! oncoexpr-runner — Mode dispatcher, stages and configuration behind the
//! `oncoexpr` binary.
//!
//! ```text
//! Cli ─▶ RunRequest ─▶ Dispatcher::run ─▶ validate ─▶ Stage::execute ─▶ Staging::commit
//! ```

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod stages;

pub use artifacts::{RunManifest, Staging};
pub use config::Config;
pub use dispatch::{DispatchState, Dispatcher, Mode, RunOutcome, RunRequest, ValidatedRun};
pub use stages::{Stage, StageRegistry};
