//! The per-server context handed to the dispatcher and engine.

use crate::config::Config;
use crate::history::AnalysisHistory;
use crate::registry::DatasetRegistry;

/// Everything one server instance owns: its datasets, its history log and
/// its settings. Passed explicitly to every operation.
#[derive(Debug, Default)]
pub struct Workspace {
    pub registry: DatasetRegistry,
    pub history: AnalysisHistory,
    pub config: Config,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self {
            registry: DatasetRegistry::new(),
            history: AnalysisHistory::new(),
            config,
        }
    }
}
