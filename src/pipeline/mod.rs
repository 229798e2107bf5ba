pub mod image_job;
pub mod job_runner;
pub mod orchestrator;
pub mod report;
