//! Supervisor tools: one `invoke_<specialist>` definition per registered specialist
//!
//! These are dispatched by the supervisor itself on the worker it already runs
//! on; they never go through the owning-thread runner.

use super::registry::SpecialistRegistry;
use crate::tools::{PropertySchema, ToolDefinition, ToolGroup, ToolInputSchema};
use std::collections::HashMap;

pub const INVOKE_PREFIX: &str = "invoke_";

/// Create the `invoke_<name>` tool for one specialist
pub fn invoke_specialist_tool(name: &str, domain: &str) -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "task".to_string(),
        PropertySchema::string(
            "What the specialist should do, in plain words. Include every detail it needs.",
        ),
    );

    ToolDefinition {
        name: format!("{}{}", INVOKE_PREFIX, name),
        description: format!("Hand a task to the {} specialist. Domain: {}", name, domain),
        input_schema: ToolInputSchema {
            schema_type: "object".to_string(),
            properties,
            required: vec!["task".to_string()],
        },
        group: ToolGroup::Agents,
    }
}

/// Tool set offered to the supervisor
pub fn supervisor_tools(registry: &SpecialistRegistry) -> Vec<ToolDefinition> {
    registry
        .domains()
        .iter()
        .map(|(name, domain)| invoke_specialist_tool(name, domain))
        .collect()
}

/// Specialist name a supervisor tool call targets.
///
/// Names without the `invoke_` prefix are passed through unchanged so the
/// router reports them as unknown specialists.
pub fn target_specialist(tool_name: &str) -> &str {
    tool_name.strip_prefix(INVOKE_PREFIX).unwrap_or(tool_name)
}

/// Instruction block describing each specialist's domain
pub fn routing_instructions(registry: &SpecialistRegistry) -> String {
    let mut prompt = String::from(
        "You are the supervisor of a video editor's assistant. \
         You do not edit the project yourself. \
         Route each part of the user's request to the specialist that owns it \
         by calling its invoke tool with a self-contained task. \
         Call several specialists in the same turn when the request spans domains. \
         When their results are in, reply with a short summary.\n\n## Specialists\n\n",
    );
    for (name, domain) in registry.domains() {
        prompt.push_str(&format!("- **{}**: {}\n", name, domain));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_tool_shape() {
        let tool = invoke_specialist_tool("timeline", "clips and tracks");
        assert_eq!(tool.name, "invoke_timeline");
        assert_eq!(tool.input_schema.required, vec!["task"]);
        assert_eq!(tool.group, ToolGroup::Agents);
    }

    #[test]
    fn test_target_specialist() {
        assert_eq!(target_specialist("invoke_color"), "color");
        assert_eq!(target_specialist("add_clip"), "add_clip");
    }
}
