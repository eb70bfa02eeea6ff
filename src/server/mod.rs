//! Newline-delimited JSON-RPC server over stdio.
//!
//! Each input line is one request or notification; each request gets one
//! response line on stdout. Logging goes to stderr so it never mixes with
//! protocol output.

pub mod protocol;
pub mod resources;

use crate::tools::{get_tool_definitions, Dispatcher, ToolResult};
use crate::workspace::Workspace;
use anyhow::Result;
use protocol::Request;
use serde_json::{json, Value};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Server state: the workspace and the dispatch table.
pub struct McpServer {
    workspace: Workspace,
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Execute one tool call directly, outside the protocol.
    pub fn call_tool(&mut self, name: &str, arguments: &Value) -> ToolResult {
        self.dispatcher.execute(&mut self.workspace, name, arguments)
    }

    /// Run the server on stdin/stdout until stdin closes.
    pub async fn run_stdio(&mut self) -> Result<()> {
        self.run(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        info!("Server ready, waiting for messages...");
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received message: {}", line);

            let message: Value = match serde_json::from_str(&line) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("Failed to parse JSON: {}", e);
                    continue;
                }
            };

            if let Some(response) = self.handle_message(message).await {
                let response_str = serde_json::to_string(&response)?;
                debug!("Sending response: {}", response_str);
                writer.write_all(response_str.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&mut self, message: Value) -> Option<Value> {
        let request: Request = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request: {}", e);
                return Some(protocol::error(
                    None,
                    protocol::INVALID_REQUEST,
                    "Invalid request",
                ));
            }
        };

        if request.is_notification() {
            debug!("Notification: {:?}", request.method);
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_deref() {
            Some("initialize") => protocol::success(
                id,
                json!({
                    "protocolVersion": protocol::PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {},
                        "resources": {}
                    },
                    "serverInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            Some("ping") => protocol::success(id, json!({})),
            Some("tools/list") => {
                protocol::success(id, json!({ "tools": get_tool_definitions() }))
            }
            Some("tools/call") => self.tools_call(&request),
            Some("resources/list") => protocol::success(
                id,
                json!({ "resources": resources::list_resources(&self.workspace) }),
            ),
            Some("resources/read") => self.resources_read(&request),
            other => {
                debug!("Unknown method: {:?}", other);
                protocol::error(id, protocol::METHOD_NOT_FOUND, "Method not found")
            }
        };

        Some(response)
    }

    fn tools_call(&mut self, request: &Request) -> Value {
        let id = request.id.clone();
        let Some(name) = request.param_str("name") else {
            return protocol::error(id, protocol::INVALID_PARAMS, "Missing tool name");
        };
        let arguments = request
            .params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or(Value::Null);

        let result = self.call_tool(name, &arguments);
        protocol::success(id, protocol::tool_content(result.text(), !result.success))
    }

    fn resources_read(&self, request: &Request) -> Value {
        let id = request.id.clone();
        let Some(uri) = request.param_str("uri") else {
            return protocol::error(id, protocol::INVALID_PARAMS, "Missing resource uri");
        };

        match resources::read_resource(&self.workspace, uri) {
            Ok(content) => match serde_json::to_value(&content) {
                Ok(content) => protocol::success(id, json!({ "contents": [content] })),
                Err(e) => protocol::error(id, protocol::INTERNAL_ERROR, e.to_string()),
            },
            Err(e) => {
                warn!("Resource read failed for {}: {}", uri, e);
                protocol::error(id, protocol::RESOURCE_NOT_FOUND, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const EMPLOYEES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/employees.csv");

    fn server() -> McpServer {
        McpServer::new(Workspace::new(Config::default()))
    }

    fn request(id: u64, method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    #[test]
    fn test_initialize_and_ping() {
        let mut server = server();
        let response =
            tokio_test::block_on(server.handle_message(request(1, "initialize", json!({}))))
                .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], "tabscope");

        let response =
            tokio_test::block_on(server.handle_message(request(2, "ping", json!({})))).unwrap();
        assert_eq!(response["result"], json!({}));
    }

    #[test]
    fn test_notifications_get_no_response() {
        let mut server = server();
        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(tokio_test::block_on(server.handle_message(note)).is_none());
    }

    #[test]
    fn test_unknown_method() {
        let mut server = server();
        let response =
            tokio_test::block_on(server.handle_message(request(3, "prompts/get", json!({}))))
                .unwrap();
        assert_eq!(response["error"]["code"], protocol::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_tools_list_has_catalog() {
        let mut server = server();
        let response =
            tokio_test::block_on(server.handle_message(request(4, "tools/list", json!({}))))
                .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 9);
        assert!(tools[0]["inputSchema"]["properties"].is_object());
    }

    #[test]
    fn test_tool_call_and_resources() {
        let mut server = server();
        let response = tokio_test::block_on(server.handle_message(request(
            5,
            "tools/call",
            json!({"name": "load_dataset", "arguments": {"path": EMPLOYEES, "name": "emp"}}),
        )))
        .unwrap();
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("loaded successfully"));

        let response =
            tokio_test::block_on(server.handle_message(request(6, "resources/list", json!({}))))
                .unwrap();
        assert_eq!(response["result"]["resources"].as_array().unwrap().len(), 4);

        let response = tokio_test::block_on(server.handle_message(request(
            7,
            "resources/read",
            json!({"uri": "data://dataset/nope"}),
        )))
        .unwrap();
        assert_eq!(response["error"]["code"], protocol::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn test_tool_errors_are_results() {
        let mut server = server();
        let response = tokio_test::block_on(server.handle_message(request(
            8,
            "tools/call",
            json!({"name": "dataset_info", "arguments": {"name": "ghost"}}),
        )))
        .unwrap();
        assert_eq!(response["result"]["isError"], true);
        assert!(response["error"].is_null());
    }

    #[test]
    fn test_run_skips_malformed_lines() {
        let mut server = server();
        let input = b"not json\n\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
        let mut output = Vec::new();

        tokio_test::block_on(server.run(&input[..], &mut output)).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let response: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(response["id"], 9);
    }
}
