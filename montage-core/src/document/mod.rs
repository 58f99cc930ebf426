//! Document mutation routing: direct application vs. queued agent edits

pub mod memory;
pub mod queue;
pub mod router;
pub mod types;

pub use memory::InMemoryDocument;
pub use queue::MutationQueue;
pub use router::{AgentContext, AgentContextGuard, MutationRouter};
pub use types::{DocumentSink, MutationAction};
