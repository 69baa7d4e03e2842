//! Gene × sample expression matrices for cohort co-expression analysis.
//!
//! Per-sample quantification files (two columns: gene, TPM) are merged into a
//! single [`ExpressionMatrix`], persisted as a gzip-compressed TSV, and
//! thresholded into boolean [`CallMatrix`] "expressed" calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use oncoexpr_matrix::{assemble_from_dir, classify, write_matrix, DEFAULT_THRESHOLD};
//!
//! fn main() -> oncoexpr_common::Result<()> {
//!     let matrix = assemble_from_dir("data/TCGA-GBM".as_ref())?;
//!     write_matrix(&matrix, "out/TCGA-GBM_expression_matrix.tsv.gz".as_ref())?;
//!
//!     let calls = classify(&matrix, DEFAULT_THRESHOLD);
//!     if let Some(fraction) = calls.expressed_fraction("DLL3") {
//!         println!("DLL3 expressed in {:.1}% of samples", fraction * 100.0);
//!     }
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod calls;
pub mod io;
pub mod matrix;

pub use assembler::{assemble, assemble_from_dir, discover_sample_files, SampleFile};
pub use calls::{classify, CallMatrix, DEFAULT_THRESHOLD};
pub use io::{read_matrix, read_sample_groups, write_matrix};
pub use matrix::ExpressionMatrix;
