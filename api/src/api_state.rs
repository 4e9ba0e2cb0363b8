use std::sync::Arc;

use common::config::AppConfig;
use orchestrator::Orchestrator;

/// Everything a handler needs, wired once at startup and cheaply cloned
/// per request. Holds no cyclic references: the orchestrator is handed in
/// fully built rather than constructed here.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, config: AppConfig) -> Self {
        Self { orchestrator, config }
    }
}
