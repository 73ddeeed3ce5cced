pub mod extractor;
pub mod job_store;
pub mod orchestrator;
pub mod rate_limit;
pub mod sweeper;
pub mod upstream;
