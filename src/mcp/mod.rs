//! MCP (Model Context Protocol) server for project context.
//!
//! Provides a JSON-RPC 2.0 interface over stdio so that AI assistants can
//! read project snapshots as resources, call analysis tools, and fetch
//! prompt templates filled with project context.

/// Request middleware: context, timing, logging, error normalization.
pub mod middleware;

/// Prompt templates and their registry.
pub mod prompts;

/// Per-caller sliding window rate limiting.
pub mod rate_limit;

/// URI-addressed resources and their registry.
pub mod resources;

/// MCP server implementation.
pub mod server;

/// Tool definitions and dispatch.
pub mod tools;

/// JSON-RPC 2.0 transport types.
pub mod transport;

pub use middleware::{normalize_error, Middleware, MiddlewareContext, NormalizedError};
pub use prompts::{PromptDefinition, PromptHandler, PromptRegistry};
pub use rate_limit::{RateLimitDecision, SlidingWindowLimiter};
pub use resources::{ResourceContents, ResourceHandler, ResourceRegistry};
pub use server::McpServer;
pub use tools::{ToolDefinition, ToolHandler, ToolRegistry};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
