//! MCP Tool Registry
//!
//! Static table of every tool the server exposes. Each entry pairs the
//! tool's definition with the function that executes it, so listing and
//! dispatch can never disagree about which tools exist.
//!
//! # Example
//!
//! ```rust
//! use cycloid_mcp::mcp::registry::{find_tool, list_tools};
//!
//! assert_eq!(list_tools().len(), 6);
//! assert!(find_tool("CYCLOID_EVENT_LIST").is_some());
//! ```

use futures::future::BoxFuture;
use serde_json::Value;

use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::mcp::tools::{blueprints, catalogs, events, pipelines, stackforms, stacks, ToolContext};

/// Executes one tool call. Never fails at the transport level.
pub type ToolExecutor = for<'a> fn(&'a ToolContext, Value) -> BoxFuture<'a, ToolCallResult>;

/// A registered tool
pub struct ToolEntry {
    pub name: &'static str,
    pub definition: fn() -> Tool,
    pub execute: ToolExecutor,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry").field("name", &self.name).finish()
    }
}

static TOOLS: &[ToolEntry] = &[
    ToolEntry {
        name: catalogs::NAME,
        definition: catalogs::cycloid_catalog_repo_list_tool,
        execute: catalogs::call,
    },
    ToolEntry {
        name: events::NAME,
        definition: events::cycloid_event_list_tool,
        execute: events::call,
    },
    ToolEntry {
        name: pipelines::NAME,
        definition: pipelines::cycloid_pipeline_list_tool,
        execute: pipelines::call,
    },
    ToolEntry {
        name: blueprints::NAME,
        definition: blueprints::cycloid_blueprint_list_tool,
        execute: blueprints::call,
    },
    ToolEntry {
        name: stacks::NAME,
        definition: stacks::cycloid_blueprint_stack_create_tool,
        execute: stacks::call,
    },
    ToolEntry {
        name: stackforms::NAME,
        definition: stackforms::cycloid_stackforms_validate_tool,
        execute: stackforms::call,
    },
];

/// Registered entries in listing order
pub fn entries() -> &'static [ToolEntry] {
    TOOLS
}

/// Definitions returned by `tools/list`
pub fn list_tools() -> Vec<Tool> {
    TOOLS.iter().map(|entry| (entry.definition)()).collect()
}

/// Look up a tool by its exact name
pub fn find_tool(name: &str) -> Option<&'static ToolEntry> {
    TOOLS.iter().find(|entry| entry.name == name)
}
