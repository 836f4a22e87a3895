pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{run_job, run_job_reported};
pub use types::{JobOutput, JobStage, ProgressReporter};
