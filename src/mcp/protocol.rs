use crate::mcp::errors::{JsonRpcError, MCPError, MCPResult, ProtocolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 message structure for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Request message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Notification message structure (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl MCPMessage {
    pub const JSONRPC_VERSION: &'static str = "2.0";

    pub fn request(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    pub fn response(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn error_response(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: None,
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    pub fn is_response(&self) -> bool {
        self.id.is_some()
            && self.method.is_none()
            && (self.result.is_some() || self.error.is_some())
    }

    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// Validate the message structure
    pub fn validate(&self) -> MCPResult<()> {
        if self.jsonrpc != Self::JSONRPC_VERSION {
            return Err(invalid(format!("Invalid JSON-RPC version: {}", self.jsonrpc)));
        }

        if self.is_request() || self.is_notification() {
            if self.result.is_some() || self.error.is_some() {
                return Err(invalid("Request message cannot have result or error fields"));
            }
        } else if self.is_response() {
            if self.params.is_some() {
                return Err(invalid("Response message cannot have params"));
            }
            if self.result.is_some() && self.error.is_some() {
                return Err(invalid("Response cannot have both result and error"));
            }
        } else {
            return Err(invalid(
                "Message does not match any valid type (request, response, notification)",
            ));
        }

        Ok(())
    }

    /// Convert to typed request
    pub fn into_request(self) -> MCPResult<MCPRequest> {
        match (self.id, self.method) {
            (Some(id), Some(method)) => Ok(MCPRequest {
                jsonrpc: self.jsonrpc,
                id,
                method,
                params: self.params,
            }),
            _ => Err(invalid("Message is not a request")),
        }
    }

    /// Convert to typed notification
    pub fn into_notification(self) -> MCPResult<MCPNotification> {
        match (self.id, self.method) {
            (None, Some(method)) => Ok(MCPNotification {
                jsonrpc: self.jsonrpc,
                method,
                params: self.params,
            }),
            _ => Err(invalid("Message is not a notification")),
        }
    }
}

fn invalid(message: impl Into<String>) -> MCPError {
    MCPError::Protocol(ProtocolError::InvalidMessage(message.into()))
}

/// MCP protocol initialization parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(rename = "clientInfo", skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
}

/// Client information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
    #[serde(default)]
    pub subscribe: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingCapability {}

/// Server capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: ToolsCapability,
    #[serde(default)]
    pub prompts: PromptsCapability,
    #[serde(default)]
    pub resources: ResourcesCapability,
    #[serde(default)]
    pub logging: LoggingCapability,
}

/// Server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Protocol message parser
pub struct MessageParser;

impl MessageParser {
    /// Parse a message from JSON bytes
    pub fn parse_message(data: &[u8]) -> MCPResult<MCPMessage> {
        let message: MCPMessage = serde_json::from_slice(data)
            .map_err(|e| MCPError::Protocol(ProtocolError::ParseError(e.to_string())))?;

        message.validate()?;
        Ok(message)
    }

    /// Serialize a message to JSON bytes
    pub fn serialize_message(message: &MCPMessage) -> MCPResult<Vec<u8>> {
        serde_json::to_vec(message)
            .map_err(|e| MCPError::Protocol(ProtocolError::InternalError(e.to_string())))
    }
}
