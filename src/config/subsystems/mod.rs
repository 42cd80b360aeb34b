pub mod matcher;
pub mod worker;
pub mod logging;

pub use matcher::MatcherConfig;
pub use worker::WorkerConfig;
pub use logging::LoggingConfig;
