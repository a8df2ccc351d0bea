//! MCP (Model Context Protocol) Server Implementation
//!
//! Provides the stdio and HTTP transports, the request handler and the
//! Cycloid tools and resources they serve.

pub mod display_hints;
pub mod elicitation;
pub mod error;
pub mod handler;
pub mod http;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;
pub mod tools;

pub use elicitation::{ChannelElicitor, ElicitResponse, Elicitor, PendingRequests};
pub use error::McpError;
pub use handler::{ClientCapabilities, McpHandler, RequestContext};
pub use http::{mcp_http_handler, router, AppState};
pub use protocol::*;
pub use resources::{list_resources, read_resource, CycloidResource};
pub use server::McpStdioServer;
