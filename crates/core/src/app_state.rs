use std::sync::Arc;

use crate::transaction::SubmissionOrchestrator;

pub struct AppState {
    pub orchestrator: Arc<SubmissionOrchestrator>,
    pub chain_id: u64,
}
