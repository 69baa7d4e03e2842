//! oncoexpr-common — Shared types, errors, and naming rules used across all oncoexpr crates.

pub mod error;
pub mod genes;
pub mod naming;

// Re-export commonly used types
pub use error::{ErrorKind, OncoexprError, Result};
pub use genes::GeneSet;
