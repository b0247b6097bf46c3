pub mod confluence;
pub mod archive;
pub mod retention;
pub mod job_marker;
pub mod poller;

// Trait-based abstractions for testability
pub mod confluence_ops;

// Re-export commonly used types and traits (used by test crate)
#[allow(unused_imports)]
pub use confluence::{ConfluenceClient, JobId, JobState, JobStatus};
#[allow(unused_imports)]
pub use confluence_ops::{ConfluenceOperations, RealConfluenceOps};
#[allow(unused_imports)]
pub use poller::{CancelToken, PollPolicy};
