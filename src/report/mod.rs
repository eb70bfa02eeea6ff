//! Report rendering and dataset export.

pub mod export;
pub mod generator;
pub mod table;

pub use export::{export_dataset, ExportFormat};
