//! Two-tier agent routing
//!
//! A supervisor reads the user's turn and hands self-contained tasks to
//! specialists through `invoke_<name>` tools. Each specialist runs its own
//! bounded tool loop on a worker task; tools that touch the document are
//! marshalled onto the owning thread.
//!
//! ```text
//! AgentRouter (supervisor loop)
//!   └─ ParallelInvoker (pool of 4, per-call timeout)
//!        ├─ Specialist "timeline" → ToolRegistry → run_on_owner(insert_entry)
//!        └─ Specialist "color"    → ToolRegistry → ...
//! ```
//!
//! ## Failure handling
//!
//! - Unknown specialist: immediate `Error: Unknown specialist '<name>'` result
//! - Missing capability: a readable "not available" answer
//! - Timeout or model error: an `Error: ...` result for that specialist only
//! - Iteration limit: partial answer, plus a follow-up note from the supervisor

pub mod invoker;
pub mod registry;
pub mod specialist;
pub mod supervisor;
pub mod tools;
pub mod types;

pub use invoker::ParallelInvoker;
pub use registry::SpecialistRegistry;
pub use specialist::Specialist;
pub use supervisor::{aggregate, AgentRouter, TurnOutcome};
pub use types::{SpecialistResult, SubAgent, SubAgentCall};
