//! Tool trait and the registry that runs tools with the right thread affinity

use crate::errors::panic_message;
use crate::owner::ThreadAffinityExecutor;
use crate::tools::types::{ThreadAffinity, ToolContext, ToolDefinition, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A named, schema-typed capability an agent can call.
///
/// Bodies are synchronous. Tools that read or edit the document declare
/// [`ThreadAffinity::Owner`] and the registry marshals them onto the owning
/// thread; everything else runs inline on the calling agent's task.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::Any
    }

    fn invoke(&self, params: Value, context: &ToolContext) -> ToolResult;

    fn name(&self) -> String {
        self.definition().name
    }
}

/// Tools available to one agent, keyed by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        let group = tool.definition().group;
        if self.tools.insert(name.clone(), tool).is_some() {
            log::warn!("[TOOLS] Replaced existing tool '{}'", name);
        } else {
            log::debug!("[TOOLS] Registered {} tool '{}'", group.as_str(), name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions sorted by name, ready to hand to a model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Run a tool on the thread its affinity demands.
    ///
    /// Unknown names, failures and panics all come back as error results.
    pub async fn execute(
        &self,
        name: &str,
        params: Value,
        context: &ToolContext,
        executor: &dyn ThreadAffinityExecutor,
    ) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::error(format!("Unknown tool: {}", name));
        };

        match tool.affinity() {
            ThreadAffinity::Any => {
                match catch_unwind(AssertUnwindSafe(|| tool.invoke(params, context))) {
                    Ok(result) => result,
                    Err(payload) => ToolResult::error(format!(
                        "Tool '{}' {}",
                        name,
                        panic_message(payload.as_ref())
                    )),
                }
            }
            ThreadAffinity::Owner => {
                log::debug!(
                    "[TOOLS] Marshalling '{}' for {} onto the owning thread",
                    name,
                    context.agent_name()
                );
                let context = context.clone();
                let outcome = executor
                    .run_on_owner(Box::new(move || tool.invoke(params, &context).into_outcome()))
                    .await;
                ToolResult::from_outcome(outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::OwnerLoop;
    use crate::tools::types::{ToolGroup, ToolInputSchema};
    use parking_lot::Mutex;
    use std::thread::ThreadId;

    struct ProbeTool {
        name: &'static str,
        affinity: ThreadAffinity,
        seen: Arc<Mutex<Vec<ThreadId>>>,
    }

    impl Tool for ProbeTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: "Records the thread it ran on".to_string(),
                input_schema: ToolInputSchema::default(),
                group: ToolGroup::System,
            }
        }

        fn affinity(&self) -> ThreadAffinity {
            self.affinity
        }

        fn invoke(&self, params: Value, _context: &ToolContext) -> ToolResult {
            self.seen.lock().push(std::thread::current().id());
            if params.get("fail").is_some() {
                return ToolResult::error("asked to fail");
            }
            if params.get("panic").is_some() {
                panic!("probe exploded");
            }
            ToolResult::success(format!("{} ok", self.name))
        }
    }

    fn registry(seen: &Arc<Mutex<Vec<ThreadId>>>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ProbeTool {
            name: "local",
            affinity: ThreadAffinity::Any,
            seen: seen.clone(),
        }));
        registry.register(Arc::new(ProbeTool {
            name: "edit",
            affinity: ThreadAffinity::Owner,
            seen: seen.clone(),
        }));
        registry
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_owner_tools_run_on_owning_thread() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let owner_thread = std::thread::spawn(move || {
            let id = std::thread::current().id();
            owner.run();
            id
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&seen);
        let context = ToolContext::new().with_agent("timeline");

        let edit = registry
            .execute("edit", Value::Null, &context, &handle)
            .await;
        assert_eq!(edit, ToolResult::success("edit ok"));
        let local = registry
            .execute("local", Value::Null, &context, &handle)
            .await;
        assert!(local.success);

        handle.stop();
        let owner_id = owner_thread.join().unwrap();
        let seen = seen.lock();
        assert_eq!(seen[0], owner_id);
        assert_ne!(seen[1], owner_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failures_come_back_as_error_results() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let owner_thread = std::thread::spawn(move || owner.run());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&seen);
        let context = ToolContext::new();

        let failed = registry
            .execute("edit", serde_json::json!({"fail": true}), &context, &handle)
            .await;
        assert_eq!(failed.error.as_deref(), Some("asked to fail"));

        let panicked = registry
            .execute("edit", serde_json::json!({"panic": true}), &context, &handle)
            .await;
        assert_eq!(panicked.error.as_deref(), Some("panicked: probe exploded"));

        let local_panic = registry
            .execute("local", serde_json::json!({"panic": true}), &context, &handle)
            .await;
        assert!(!local_panic.success);

        let unknown = registry
            .execute("nope", Value::Null, &context, &handle)
            .await;
        assert_eq!(unknown.error.as_deref(), Some("Unknown tool: nope"));

        handle.stop();
        owner_thread.join().unwrap();
    }

    #[test]
    fn test_definitions_sorted_by_name() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let names: Vec<String> = registry(&seen)
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["edit", "local"]);
    }
}
