pub mod job;
pub mod process;
pub mod upstream;
