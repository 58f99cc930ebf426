//! Cross-thread coordination for a single-threaded document editor
//!
//! - [`owner`]: the owning-thread event loop and the `ThreadAffinityExecutor` seam
//! - [`jobs`]: priority job queue with one worker and owner-thread completions
//! - [`document`]: mutation routing, the agent-context flag and the drain queue
//! - [`tools`]: tool trait, registry and the built-in document tools
//! - [`ai`]: model interface and the supervisor/specialist layer
//! - [`coordinator`]: the context object tying it all together

pub mod ai;
pub mod config;
pub mod coordinator;
pub mod document;
pub mod errors;
pub mod jobs;
pub mod owner;
pub mod tools;

pub use config::Config;
pub use coordinator::Coordinator;
pub use errors::CoordError;
