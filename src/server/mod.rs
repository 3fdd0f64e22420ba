//! MCP server module.
//!
//! This module implements the Model Context Protocol (MCP) server that exposes
//! the paper cache as three tools. Messages are JSON-RPC 2.0 objects, one per
//! line, read from stdin and answered on stdout. Requests are handled strictly
//! one at a time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::provider::PaperProvider;
use crate::service::{PaperCacheService, ServiceResult, DEFAULT_MAX_RESULTS};
use crate::storage::PaperStorage;

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

pub const TOOL_SEARCH_PAPERS: &str = "search_papers";
pub const TOOL_EXTRACT_PAPER_INFO: &str = "extract_paper_info";
pub const TOOL_GET_PAPER_CITATIONS: &str = "get_paper_citations";

const JSONRPC_VERSION: &str = "2.0";

// JSON-RPC error codes
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// Errors that stop the server loop.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reading or writing the transport failed
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Arguments of the `search_papers` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPapersRequest {
    /// The topic to search for
    pub topic: String,

    /// Maximum number of results to retrieve (default: 3)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// Arguments of the `extract_paper_info` and `get_paper_citations` tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperIdRequest {
    /// The arXiv identifier to look up
    pub paper_id: String,
}

/// Identity advertised during `initialize`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name reported to clients
    pub name: String,

    /// Server version reported to clients
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "research".to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// MCP server instance.
///
/// Owns the cache service and answers protocol messages for it.
pub struct McpServer<P, S>
where
    P: PaperProvider,
    S: PaperStorage,
{
    config: ServerConfig,
    service: PaperCacheService<P, S>,
}

impl<P, S> McpServer<P, S>
where
    P: PaperProvider,
    S: PaperStorage,
{
    /// Create a new MCP server instance.
    ///
    /// # Arguments
    /// * `config` - Identity reported to clients
    /// * `service` - The paper cache the tools operate on
    pub fn new(config: ServerConfig, service: PaperCacheService<P, S>) -> Self {
        Self { config, service }
    }

    /// Serve stdin/stdout until stdin is closed.
    ///
    /// # Errors
    /// Returns `ServerError` if the transport fails
    pub async fn run(&self) -> ServerResult<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited messages from `reader`, answering on `writer`.
    ///
    /// Returns when the reader reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> ServerResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("{} MCP server ready on stdio", self.config.name);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(&line).await {
                let mut encoded = serde_json::to_string(&response)?;
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one raw message.
    ///
    /// # Returns
    /// The response to send back, or `None` for notifications
    pub async fn handle_message(&self, raw: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable message: {}", e);
                return Some(to_value(RpcResponse::failure(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                )));
            }
        };

        let id_hint = value.get("id").cloned().unwrap_or(Value::Null);
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(to_value(RpcResponse::failure(
                    id_hint,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                )));
            }
        };

        if request.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            debug!("Message without jsonrpc \"2.0\" marker: {}", request.method);
        }

        let Some(id) = request.id else {
            debug!("Notification: {}", request.method);
            return None;
        };

        debug!("Request {}: {}", id, request.method);
        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        };
        Some(to_value(response))
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::new(INVALID_PARAMS, "Missing tool name"))?;
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                self.call_tool(name, arguments).await
            }
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);
        info!("Client initialized (protocol {})", version);

        json!({
            "protocolVersion": version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.config.name,
                "version": self.config.version,
            },
        })
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, RpcError> {
        debug!("Calling tool {} with {}", name, arguments);

        match name {
            TOOL_SEARCH_PAPERS => {
                let request: SearchPapersRequest = match serde_json::from_value(arguments) {
                    Ok(request) => request,
                    Err(e) => return Ok(tool_error(name, &format!("invalid arguments: {}", e))),
                };
                Ok(match self.service.search(&request.topic, request.max_results).await {
                    Ok(ids) => json!({
                        "content": ids.iter().map(|id| text_content(id)).collect::<Vec<_>>(),
                        "structuredContent": { "result": ids },
                        "isError": false,
                    }),
                    Err(e) => tool_error(name, &e.to_string()),
                })
            }
            TOOL_EXTRACT_PAPER_INFO => {
                let request: PaperIdRequest = match serde_json::from_value(arguments) {
                    Ok(request) => request,
                    Err(e) => return Ok(tool_error(name, &format!("invalid arguments: {}", e))),
                };
                let outcome = self.service.extract_info(&request.paper_id).await;
                Ok(text_result(name, outcome.and_then(|o| o.to_message())))
            }
            TOOL_GET_PAPER_CITATIONS => {
                let request: PaperIdRequest = match serde_json::from_value(arguments) {
                    Ok(request) => request,
                    Err(e) => return Ok(tool_error(name, &format!("invalid arguments: {}", e))),
                };
                let outcome = self.service.get_citations(&request.paper_id).await;
                Ok(text_result(name, outcome.and_then(|o| o.to_message())))
            }
            other => Err(RpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", other))),
        }
    }
}

fn to_value(response: RpcResponse) -> Value {
    serde_json::to_value(&response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": Value::Null,
            "error": { "code": INTERNAL_ERROR, "message": e.to_string() },
        })
    })
}

fn text_content(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

fn text_result(tool: &str, message: ServiceResult<String>) -> Value {
    match message {
        Ok(text) => json!({ "content": [text_content(&text)], "isError": false }),
        Err(e) => tool_error(tool, &e.to_string()),
    }
}

fn tool_error(tool: &str, message: &str) -> Value {
    warn!("Tool {} failed: {}", tool, message);
    json!({
        "content": [text_content(&format!("Error executing tool {}: {}", tool, message))],
        "isError": true,
    })
}

/// Definitions returned by `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": TOOL_SEARCH_PAPERS,
            "description": "Search for papers on arXiv based on a topic and store their information.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "The topic to search for" },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "default": DEFAULT_MAX_RESULTS,
                        "description": "Maximum number of results to retrieve"
                    }
                },
                "required": ["topic"]
            },
            "outputSchema": {
                "type": "object",
                "properties": {
                    "result": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["result"]
            }
        },
        {
            "name": TOOL_EXTRACT_PAPER_INFO,
            "description": "Extract information about a paper from the local cache of searched topics.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "paper_id": { "type": "string", "description": "The arXiv ID of the paper" }
                },
                "required": ["paper_id"]
            }
        },
        {
            "name": TOOL_GET_PAPER_CITATIONS,
            "description": "Get citation information for a paper by its arXiv ID. Returns citation in multiple formats (APA, MLA, BibTeX).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "paper_id": { "type": "string", "description": "The arXiv ID of the paper" }
                },
                "required": ["paper_id"]
            }
        }
    ])
}
