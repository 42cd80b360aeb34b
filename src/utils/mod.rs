pub mod job_tracker;
pub mod logger;
pub mod processing;
pub mod worker;

pub use logger::init_logging;
pub use processing::WorkerPool;
pub use worker::Worker;
