//! MCP server that reads JSON-RPC 2.0 messages from stdin and writes
//! responses to stdout.
//!
//! Requests are dispatched through a method table. Every handler runs inside
//! the [`Middleware`], which rate limits, times, logs, and turns errors into
//! protocol error codes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use crate::errors::{ContextError, Result};
use crate::project::ProjectContext;

use super::middleware::{Middleware, MiddlewareContext};
use super::prompts::PromptRegistry;
use super::resources::ResourceRegistry;
use super::tools::ToolRegistry;
use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse};

const PROTOCOL_VERSION: &str = "2024-11-05";
const DEFAULT_CALLER: &str = "anonymous";

type MethodHandler = fn(&McpServer, &MiddlewareContext) -> Result<Value>;

/// Runtime statistics for the MCP server.
pub struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// The MCP server wrapping one [`ProjectContext`].
pub struct McpServer {
    project: ProjectContext,
    middleware: Middleware,
    resources: ResourceRegistry,
    tools: ToolRegistry,
    prompts: PromptRegistry,
    methods: HashMap<&'static str, MethodHandler>,
    stats: ServerStats,
    tool_call_counts: Mutex<HashMap<String, u64>>,
    caller: Mutex<String>,
}

impl McpServer {
    /// Creates a server with the default resources, tools, and prompts and
    /// the rate limit from the project configuration.
    pub fn new(project: ProjectContext) -> Self {
        let middleware = Middleware::new(&project.config().rate_limit);
        Self::with_middleware(project, middleware)
    }

    pub fn with_middleware(project: ProjectContext, middleware: Middleware) -> Self {
        let mut methods: HashMap<&'static str, MethodHandler> = HashMap::new();
        methods.insert("initialize", Self::handle_initialize);
        methods.insert("ping", Self::handle_ping);
        methods.insert("resources/list", Self::handle_resources_list);
        methods.insert("resources/templates/list", Self::handle_resource_templates_list);
        methods.insert("resources/read", Self::handle_resources_read);
        methods.insert("tools/list", Self::handle_tools_list);
        methods.insert("tools/call", Self::handle_tools_call);
        methods.insert("prompts/list", Self::handle_prompts_list);
        methods.insert("prompts/get", Self::handle_prompts_get);

        Self {
            project,
            middleware,
            resources: ResourceRegistry::with_defaults(),
            tools: ToolRegistry::with_defaults(),
            prompts: PromptRegistry::with_defaults(),
            methods,
            stats: ServerStats::new(),
            tool_call_counts: Mutex::new(HashMap::new()),
            caller: Mutex::new(DEFAULT_CALLER.to_string()),
        }
    }

    /// Runs the server, reading JSON-RPC requests from stdin and writing
    /// responses to stdout. Runs until stdin is closed.
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        info!(root = %self.project.root().display(), "MCP server listening on stdio");

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(resp) = self.handle_line(line) else {
                continue;
            };
            let json_line = match serde_json::to_string(&resp) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "failed to serialize response");
                    continue;
                }
            };
            let output = format!("{}\n", json_line);
            if let Err(e) = stdout.write_all(output.as_bytes()).await {
                error!(error = %e, "failed to write response");
                break;
            }
            if let Err(e) = stdout.flush().await {
                error!(error = %e, "failed to flush stdout");
                break;
            }
        }

        self.log_stats();
        Ok(())
    }

    /// Parses and handles one line of input.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(&request),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Some(JsonRpcResponse::error(
                    Value::Null,
                    ErrorCode::ParseError,
                    format!("failed to parse JSON-RPC request: {}", e),
                ))
            }
        }
    }

    /// Dispatches a parsed JSON-RPC request to the appropriate handler.
    ///
    /// Returns `None` for notifications.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        let method = request.method.as_str();
        if method == "initialized" || method.starts_with("notifications/") {
            return None;
        }
        let id = request.id.clone();

        let Some(&handler) = self.methods.get(method) else {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            return Some(JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("method not found: {}", method),
            ));
        };

        let caller = self.caller_name();
        let response = match self
            .middleware
            .run(method, request.params.as_ref(), &caller, |ctx| handler(self, ctx))
        {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                JsonRpcResponse::error(id, e.code, e.message)
            }
        };
        Some(response)
    }

    fn caller_name(&self) -> String {
        self.caller
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|_| DEFAULT_CALLER.to_string())
    }

    fn handle_initialize(&self, ctx: &MiddlewareContext) -> Result<Value> {
        let client = ctx
            .params
            .as_ref()
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty());
        if let Some(name) = client {
            if let Ok(mut caller) = self.caller.lock() {
                *caller = name.to_string();
            }
            info!(client = name, "client initialized");
        }

        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "resources": {},
                "tools": {},
                "prompts": {}
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        }))
    }

    fn handle_ping(&self, _ctx: &MiddlewareContext) -> Result<Value> {
        Ok(json!({}))
    }

    fn handle_resources_list(&self, _ctx: &MiddlewareContext) -> Result<Value> {
        Ok(json!({ "resources": self.resources.list() }))
    }

    fn handle_resource_templates_list(&self, _ctx: &MiddlewareContext) -> Result<Value> {
        let templates: Vec<Value> = self
            .resources
            .templates()
            .into_iter()
            .map(|d| {
                json!({
                    "uriTemplate": d.uri,
                    "name": d.name,
                    "description": d.description,
                    "mimeType": d.mime_type,
                })
            })
            .collect();
        Ok(json!({ "resourceTemplates": templates }))
    }

    fn handle_resources_read(&self, ctx: &MiddlewareContext) -> Result<Value> {
        let uri = required_str(&ctx.params, "uri")?;
        self.resources.read(&self.project, uri)
    }

    fn handle_tools_list(&self, _ctx: &MiddlewareContext) -> Result<Value> {
        Ok(json!({ "tools": self.tools.definitions() }))
    }

    fn handle_tools_call(&self, ctx: &MiddlewareContext) -> Result<Value> {
        let name = required_str(&ctx.params, "name")?;
        let arguments = ctx
            .params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or(Value::Null);

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut counts) = self.tool_call_counts.lock() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }

        self.tools.call(&self.project, name, &arguments)
    }

    fn handle_prompts_list(&self, _ctx: &MiddlewareContext) -> Result<Value> {
        Ok(json!({ "prompts": self.prompts.list() }))
    }

    fn handle_prompts_get(&self, ctx: &MiddlewareContext) -> Result<Value> {
        let name = required_str(&ctx.params, "name")?;
        let arguments = ctx.params.as_ref().and_then(|p| p.get("arguments"));
        self.prompts.get(&self.project, name, arguments)
    }

    /// Returns the current server runtime statistics as a JSON value.
    pub fn server_stats_json(&self) -> Value {
        let uptime = self.stats.started_at.elapsed();
        let tool_counts: Value = self
            .tool_call_counts
            .lock()
            .map(|counts| json!(*counts))
            .unwrap_or(json!({}));

        json!({
            "uptime_secs": uptime.as_secs(),
            "total_requests": self.stats.total_requests.load(Ordering::Relaxed),
            "tool_calls": self.stats.tool_calls.load(Ordering::Relaxed),
            "errors": self.stats.errors.load(Ordering::Relaxed),
            "tool_call_counts": tool_counts,
        })
    }

    fn log_stats(&self) {
        let tool_counts = self.server_stats_json()["tool_call_counts"].to_string();
        info!(
            uptime_secs = self.stats.started_at.elapsed().as_secs(),
            total_requests = self.stats.total_requests.load(Ordering::Relaxed),
            tool_calls = self.stats.tool_calls.load(Ordering::Relaxed),
            errors = self.stats.errors.load(Ordering::Relaxed),
            tool_call_counts = %tool_counts,
            "MCP server shutting down"
        );
    }
}

fn required_str<'a>(params: &'a Option<Value>, key: &str) -> Result<&'a str> {
    params
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .ok_or_else(|| ContextError::validation(format!("missing '{}' parameter", key)))
}
