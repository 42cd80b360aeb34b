pub mod multiset;
pub mod diff;
pub mod closest;
pub mod concurrent;
// Re-export the main types
pub use self::multiset::TargetMultiset;
pub use self::diff::{DiffEngine, ScanResult};
pub use self::closest::{distance, ClosestMatcher};
pub use self::concurrent::{OutcomeCollector, ProgressEvent, ProgressReporter, RunSummary};
