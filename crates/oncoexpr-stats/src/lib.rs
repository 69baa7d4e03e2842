//! oncoexpr-stats — Co-expression statistics over expression call matrices.
//!
//! - [`costats`]: joint-expression counts for every non-empty subset of a
//!   target gene set.
//! - [`correlation`]: Pearson/Spearman correlation among target genes, and
//!   [`heatmap`] to render the correlation matrix.
//! - [`markers`] and [`enrichment`]: marker ranking and pathway
//!   over-representation for the marker/pathway analysis modes.

pub mod combinations;
pub mod correlation;
pub mod costats;
pub mod enrichment;
pub mod fdr;
pub mod gene_sets;
pub mod heatmap;
pub mod markers;
pub mod pvalue;
pub mod ranks;
mod table;

pub use correlation::{correlate, pairwise_correlations, CorrelationMatrix, PairwiseCorrelation};
pub use costats::{compute_costats, SubsetStatistic, MAX_SUBSET_GENES};
pub use enrichment::{over_representation, EnrichmentRecord};
pub use gene_sets::GeneSetLibrary;
pub use heatmap::{render_heatmap, HeatmapStyle};
pub use markers::{rank_markers, GroupComparison, MarkerParams, MarkerRecord};
