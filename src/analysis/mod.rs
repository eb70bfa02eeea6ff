//! Analysis engine.
//!
//! Every operation here is a pure function over a borrowed [`Dataset`]
//! (crate::models::Dataset); resolution by name and history bookkeeping
//! live in the tool dispatcher.

pub mod aggregator;
pub mod correlation;
pub mod filter;
pub mod insights;
pub mod quality;
pub mod stats;

pub use aggregator::{group_analysis, GroupAnalysis};
pub use correlation::{find_correlations, CorrelationMethod};
pub use filter::{filter_dataset, Condition};
pub use insights::{generate_insights, InsightFocus};
pub use quality::{data_quality_check, QualityReport};
pub use stats::calculate_statistics;
