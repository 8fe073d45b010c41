mod orchestrator;
mod report;

pub use orchestrator::SyncOrchestrator;
pub use report::SyncReport;
