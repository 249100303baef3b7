pub mod group;
pub mod orchestrator;
pub mod report;

pub use orchestrator::run_digest;
pub use report::DigestReport;
