mod orchestrator;
pub use orchestrator::{SubmissionConfig, SubmissionOrchestrator, SubmittedOperation};

mod tracker;
pub use tracker::{TransactionOutcome, TransactionTracker};

pub mod types;
