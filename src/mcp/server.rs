//! MCP server: owns the tool registry and drives one message loop per
//! connection, over stdio or a WebSocket listener.

use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::mcp::{
    errors::{JsonRpcError, MCPError, MCPResult, ServerError, TransportError},
    protocol::{
        InitializeParams, InitializeResult, MCPMessage, MCPRequest, ServerCapabilities,
        ServerInfo,
    },
    tools::{ExecutionContext, ToolError, ToolRegistry},
    transport::{MCPTransport, StdioTransport, WebSocketTransport},
    MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};

/// MCP Server implementation
pub struct MCPServer {
    tool_registry: Arc<ToolRegistry>,
}

impl MCPServer {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self { tool_registry }
    }

    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Serve a single session over stdin/stdout until the input ends
    pub async fn serve_stdio(&self) -> MCPResult<()> {
        info!("Starting {} v{} on stdio", SERVER_NAME, SERVER_VERSION);
        self.handle_connection(Box::new(StdioTransport::new()), "stdio".to_string())
            .await
    }

    /// Accept WebSocket connections on `addr` until Ctrl-C
    pub async fn serve_websocket(self: Arc<Self>, addr: SocketAddr) -> MCPResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| MCPError::Transport(TransportError::Io(e)))?;

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };

        self.serve_listener(listener, shutdown).await
    }

    /// Accept WebSocket connections on a bound listener until `shutdown`
    /// resolves. Each connection is served in its own task.
    pub async fn serve_listener<S>(self: Arc<Self>, listener: TcpListener, shutdown: S) -> MCPResult<()>
    where
        S: Future<Output = ()>,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| MCPError::Transport(TransportError::Io(e)))?;
        info!(
            "Starting {} v{} on ws://{}",
            SERVER_NAME, SERVER_VERSION, local_addr
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let server = self.clone();
                    tokio::spawn(async move {
                        let connection_id = Uuid::new_v4().to_string();
                        debug!("Accepted connection {} from {}", connection_id, peer);

                        let transport = match WebSocketTransport::new(stream).await {
                            Ok(transport) => transport,
                            Err(e) => {
                                warn!("WebSocket handshake with {} failed: {}", peer, e);
                                return;
                            }
                        };

                        if let Err(e) = server.handle_connection(Box::new(transport), connection_id).await {
                            error!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a connection until the peer goes away. Requests are processed
    /// in arrival order and queued responses are flushed before returning.
    pub async fn handle_connection(
        &self,
        mut transport: Box<dyn MCPTransport>,
        connection_id: String,
    ) -> MCPResult<()> {
        info!(
            "New connection: {} ({})",
            connection_id,
            transport.transport_type()
        );
        let start_time = Instant::now();

        loop {
            let response = match transport.receive().await {
                Ok(message) => self.handle_message(message, &connection_id).await,
                Err(MCPError::Protocol(e)) => {
                    Some(MCPMessage::error_response(Value::Null, JsonRpcError::from(e)))
                }
                Err(e) => {
                    debug!("Connection {} input closed: {}", connection_id, e);
                    break;
                }
            };

            if let Some(response) = response {
                if let Err(e) = transport.send(response).await {
                    error!("Failed to send response on {}: {}", connection_id, e);
                    break;
                }
            }

            if !transport.is_connected() {
                break;
            }
        }

        transport.close().await?;
        info!(
            "Connection closed: {} (duration: {:?})",
            connection_id,
            start_time.elapsed()
        );
        Ok(())
    }

    /// Handle one inbound message, returning the response to send if any
    pub async fn handle_message(
        &self,
        message: MCPMessage,
        connection_id: &str,
    ) -> Option<MCPMessage> {
        if message.is_request() {
            match message.into_request() {
                Ok(request) => Some(self.handle_request(request, connection_id).await),
                Err(e) => {
                    error!("Malformed request: {}", e);
                    None
                }
            }
        } else if message.is_notification() {
            if let Ok(notification) = message.into_notification() {
                debug!("Notification on {}: {}", connection_id, notification.method);
            }
            None
        } else {
            warn!("Ignoring unexpected message on {}", connection_id);
            None
        }
    }

    /// Handle a request message
    pub async fn handle_request(&self, request: MCPRequest, connection_id: &str) -> MCPMessage {
        debug!("Request {} on {}: {}", request.id, connection_id, request.method);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => {
                self.handle_tool_call(request.params, &request.id, connection_id)
                    .await
            }
            "prompts/list" => Ok(json!({ "prompts": [] })),
            "resources/list" => Ok(json!({ "resources": [] })),
            _ => Err(MCPError::Server(ServerError::MethodNotFound(
                request.method.clone(),
            ))),
        };

        match response {
            Ok(result) => MCPMessage::response(request.id, result),
            Err(error) => {
                debug!("Request {} failed: {}", request.id, error);
                MCPMessage::error_response(request.id, JsonRpcError::from(error))
            }
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> MCPResult<Value> {
        if let Some(params) = params {
            let params: InitializeParams = serde_json::from_value(params)
                .map_err(|e| MCPError::Server(ServerError::InvalidParams(e.to_string())))?;
            match params.client_info {
                Some(client) => info!(
                    "Client {} {} initializing (protocol {})",
                    client.name, client.version, params.protocol_version
                ),
                None => info!("Client initializing (protocol {})", params.protocol_version),
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            instructions: None,
        };

        Ok(serde_json::to_value(result)?)
    }

    async fn handle_list_tools(&self) -> MCPResult<Value> {
        let tools = self.tool_registry.list_tools().await;
        Ok(json!({ "tools": tools }))
    }

    async fn handle_tool_call(
        &self,
        params: Option<Value>,
        request_id: &Value,
        connection_id: &str,
    ) -> MCPResult<Value> {
        let params = params.unwrap_or(Value::Null);
        let tool_name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MCPError::Server(ServerError::InvalidParams("Missing tool name".to_string()))
            })?;

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(arguments) => arguments.clone(),
        };

        let mut context = ExecutionContext::new(connection_id, request_id.clone());
        let result = self
            .tool_registry
            .execute_tool(tool_name, arguments, &mut context)
            .await
            .map_err(|e| match e {
                ToolError::NotFound(name) => MCPError::Server(ServerError::ToolNotFound(name)),
                other => MCPError::ToolExecution(other),
            })?;

        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::{MCPTool, ToolResult};
    use async_trait::async_trait;

    struct PanickyTool;

    #[async_trait]
    impl MCPTool for PanickyTool {
        fn name(&self) -> &str {
            "panicky"
        }

        fn description(&self) -> &str {
            "Always panics"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(
            &self,
            _params: Value,
            _context: &mut ExecutionContext,
        ) -> Result<ToolResult, ToolError> {
            panic!("index out of range")
        }
    }

    async fn server() -> MCPServer {
        let registry = Arc::new(ToolRegistry::new());
        registry.register_tool(Arc::new(PanickyTool)).await.unwrap();
        MCPServer::new(registry)
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> MCPRequest {
        MCPRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(id),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server().await;
        let response = server
            .handle_request(
                request(
                    1,
                    "initialize",
                    Some(json!({
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "clientInfo": {"name": "test", "version": "1.0"}
                    })),
                ),
                "test",
            )
            .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "Jira MCP");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server().await;
        let response = server.handle_request(request(2, "foo/bar", None), "test").await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_tool_call_errors() {
        let server = server().await;

        let response = server
            .handle_request(request(3, "tools/call", Some(json!({}))), "test")
            .await;
        assert_eq!(response.error.unwrap().code, -32602);

        let response = server
            .handle_request(
                request(4, "tools/call", Some(json!({"name": "jira_nope"}))),
                "test",
            )
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("jira_nope"));
    }

    #[tokio::test]
    async fn test_panicking_tool_returns_text() {
        let server = server().await;

        let response = server
            .handle_request(
                request(5, "tools/call", Some(json!({"name": "panicky"}))),
                "test",
            )
            .await;
        let text = response.result.unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.starts_with("Panic: index out of range"));

        let response = server.handle_request(request(6, "ping", None), "test").await;
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let server = server().await;
        let response = server
            .handle_message(
                MCPMessage::notification("notifications/initialized", None),
                "test",
            )
            .await;
        assert!(response.is_none());
    }
}
