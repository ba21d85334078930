use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use crate::mcp::tools::ToolError;

pub type MCPResult<T> = Result<T, MCPError>;

/// Main error type for protocol-level operations
#[derive(Debug, thiserror::Error)]
pub enum MCPError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Tool execution error: {0}")]
    ToolExecution(#[from] ToolError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,
}

/// Protocol-level errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Errors raised while dispatching a request
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy)]
pub enum JsonRpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

/// JSON-RPC error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }
}

impl From<MCPError> for JsonRpcError {
    fn from(error: MCPError) -> Self {
        match error {
            MCPError::Server(ServerError::MethodNotFound(method)) => JsonRpcError::new(
                JsonRpcErrorCode::MethodNotFound,
                format!("Method not found: {}", method),
            ),
            MCPError::Server(ServerError::InvalidParams(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg)
            }
            MCPError::Server(ServerError::ToolNotFound(name))
            | MCPError::ToolExecution(ToolError::NotFound(name)) => JsonRpcError::new(
                JsonRpcErrorCode::InvalidParams,
                format!("Unknown tool: {}", name),
            ),
            MCPError::Protocol(ProtocolError::ParseError(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::ParseError, msg)
            }
            MCPError::Protocol(ProtocolError::InvalidMessage(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidRequest, msg)
            }
            MCPError::Validation(msg) => JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg),
            _ => JsonRpcError::new(JsonRpcErrorCode::InternalError, error.to_string()),
        }
    }
}

impl From<ProtocolError> for JsonRpcError {
    fn from(error: ProtocolError) -> Self {
        MCPError::Protocol(error).into()
    }
}

impl From<ServerError> for JsonRpcError {
    fn from(error: ServerError) -> Self {
        MCPError::Server(error).into()
    }
}
