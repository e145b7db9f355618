//! Edge case integration tests for contexthub-mcp.
//!
//! Drives the protocol handler directly with JSON-RPC values against a mock
//! backend, covering the handshake, dispatch, both error channels, and the
//! concurrent-create guarantee.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use contexthub::{BackoffPolicy, ClientConfig, ContextClient};
use contexthub_mcp::protocol::{ProtocolHandler, SessionState};
use contexthub_mcp::types::*;

const PROJECT: Uuid = Uuid::from_u128(0x7f2c_1b4e_9a3d_4f6b_8c2e_1d5a_7b9c_3e0f);
const FILE_ID: Uuid = Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888);

// ─────────────────────── helpers ───────────────────────

/// Handler wired to a mock backend, with retries effectively off.
fn handler_for(server_uri: &str) -> ProtocolHandler {
    let mut config = ClientConfig::new(Url::parse(server_uri).unwrap(), "test-token", PROJECT);
    config.backoff = BackoffPolicy::none();
    config.timeout = Duration::from_secs(2);
    ProtocolHandler::new(Arc::new(ContextClient::new(config).unwrap()))
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build an initialize request.
fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    mcp_request(id, "tools/call", json!({ "name": name, "arguments": arguments }))
}

/// Send a request through the handler and return the terminal message as JSON.
async fn send(handler: &ProtocolHandler, msg: Value) -> Value {
    let request: JsonRpcRequest = serde_json::from_value(msg).unwrap();
    serde_json::to_value(handler.handle_request(request).await).unwrap()
}

async fn notify(handler: &ProtocolHandler, method: &str, params: Option<Value>) {
    let notification = JsonRpcNotification {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: method.to_string(),
        params,
    };
    handler.handle_notification(notification).await;
}

/// The text payload of a tool call response.
fn tool_text(resp: &Value) -> &str {
    resp["result"]["content"][0]["text"].as_str().unwrap()
}

fn file_json(filename: &str) -> Value {
    json!({
        "id": FILE_ID,
        "filename": filename,
        "content": "# Notes",
        "fileType": "markdown"
    })
}

fn listing_json(files: Vec<Value>) -> Value {
    json!({ "projectId": PROJECT, "files": files })
}

// ═══════════════════════════════════════════════════════
// HANDSHAKE & LIFECYCLE
// ═══════════════════════════════════════════════════════

/// Test 1: Full handshake — initialize response shape, then initialized.
#[tokio::test]
async fn test_01_initialize_handshake() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    let resp = send(&handler, init_request()).await;
    let result = &resp["result"];

    assert_eq!(result["protocolVersion"], "2025-03-26");
    assert_eq!(result["serverInfo"]["name"], "contexthub-mcp");
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());
    assert!(
        result["instructions"].as_str().unwrap().contains("add_file"),
        "instructions should describe the tool surface"
    );
    assert_eq!(handler.session_state().await, SessionState::Initializing);

    notify(&handler, "notifications/initialized", None).await;
    assert_eq!(handler.session_state().await, SessionState::Ready);

    println!("TEST 01 — Initialize Handshake: PASS");
}

/// Test 2: Unknown protocol version — server answers with its default.
#[tokio::test]
async fn test_02_unknown_protocol_version_falls_back() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    let resp = send(
        &handler,
        mcp_request(
            0,
            "initialize",
            json!({
                "protocolVersion": "1999-12-31",
                "clientInfo": { "name": "old-client", "version": "0.1" }
            }),
        ),
    )
    .await;

    assert_eq!(
        resp["result"]["protocolVersion"],
        DEFAULT_PROTOCOL_VERSION,
        "unsupported version negotiates down to the default"
    );

    println!("TEST 02 — Unknown Protocol Version: PASS");
}

/// Test 3: Client never sends initialized — fallback window promotes.
#[tokio::test]
async fn test_03_fallback_promotion_without_initialized() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri()).with_init_fallback(Duration::from_millis(50));

    send(&handler, init_request()).await;
    assert_eq!(handler.session_state().await, SessionState::Initializing);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        handler.session_state().await,
        SessionState::Ready,
        "session promotes on its own after the window"
    );

    println!("TEST 03 — Fallback Promotion: PASS");
}

/// Test 4: The bare `initialized` method name is accepted too.
#[tokio::test]
async fn test_04_bare_initialized_alias() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    send(&handler, init_request()).await;
    notify(&handler, "initialized", None).await;
    assert_eq!(handler.session_state().await, SessionState::Ready);

    println!("TEST 04 — Bare Initialized Alias: PASS");
}

/// Test 5: Ping answers an empty object in any state, even uninitialized.
#[tokio::test]
async fn test_05_ping_before_initialize() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    let resp = send(&handler, mcp_request(1, "ping", json!({}))).await;
    assert_eq!(resp["result"], json!({}));

    println!("TEST 05 — Ping Before Initialize: PASS");
}

// ═══════════════════════════════════════════════════════
// DISPATCH ERRORS
// ═══════════════════════════════════════════════════════

/// Test 6: Unknown method — METHOD_NOT_FOUND.
#[tokio::test]
async fn test_06_unknown_method() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    let resp = send(&handler, mcp_request(1, "prompts/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);

    println!("TEST 06 — Unknown Method: PASS");
}

/// Test 7: Unknown tool name — METHOD_NOT_FOUND, not a tool result.
#[tokio::test]
async fn test_07_unknown_tool() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    let resp = send(&handler, tool_call(1, "does_not_exist", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert!(resp.get("result").is_none());

    println!("TEST 07 — Unknown Tool: PASS");
}

/// Test 8: Invalid tool arguments — INVALID_PARAMS at the protocol level.
#[tokio::test]
async fn test_08_invalid_tool_params() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    // Missing required argument.
    let resp = send(&handler, tool_call(1, "get_file", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32602);

    // Malformed UUID.
    let resp = send(
        &handler,
        tool_call(2, "get_file", json!({ "file_id": "zzz-not-a-uuid" })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
    assert!(
        resp["error"]["message"].as_str().unwrap().contains("UUID"),
        "message should name the malformed field: {resp}"
    );

    // Missing initialize params entirely.
    let resp = send(
        &handler,
        json!({ "jsonrpc": "2.0", "id": 3, "method": "initialize" }),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);

    println!("TEST 08 — Invalid Tool Params: PASS");
}

// ═══════════════════════════════════════════════════════
// TOOLS AGAINST THE BACKEND
// ═══════════════════════════════════════════════════════

/// Test 9: tools/list advertises the full fixed surface.
#[tokio::test]
async fn test_09_tools_list_names() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    let resp = send(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let names: Vec<&str> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    assert_eq!(
        names,
        vec![
            "get_contexts",
            "get_file",
            "add_file",
            "generate_initial_context",
            "update_file",
            "delete_file"
        ]
    );
    for tool in resp["result"]["tools"].as_array().unwrap() {
        assert!(tool["inputSchema"]["type"] == "object");
    }

    println!("TEST 09 — Tools List: PASS");
}

/// Test 10: get_contexts round trip — listing comes back as JSON text.
#[tokio::test]
async fn test_10_get_contexts_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(vec![file_json("notes.md")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri());
    let resp = send(&handler, tool_call(1, "get_contexts", json!({}))).await;

    assert!(resp["result"].get("isError").is_none(), "not an error: {resp}");
    let listing: Value = serde_json::from_str(tool_text(&resp)).unwrap();
    assert_eq!(listing["files"][0]["filename"], "notes.md");

    println!("TEST 10 — get_contexts Success: PASS");
}

/// Test 11: Backend 404 — error-flagged tool result, not a protocol error.
#[tokio::test]
async fn test_11_backend_not_found_is_tool_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}/files/{FILE_ID}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": "No such file"
        })))
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri());
    let resp = send(
        &handler,
        tool_call(1, "get_file", json!({ "file_id": FILE_ID })),
    )
    .await;

    assert!(resp.get("error").is_none(), "must not be a protocol error: {resp}");
    assert_eq!(resp["result"]["isError"], true);
    assert!(
        tool_text(&resp).contains("Resource not found"),
        "fixed not-found message expected: {resp}"
    );

    println!("TEST 11 — Backend 404 as Tool Result: PASS");
}

/// Test 12: Backend 401 — auth failure readable by the model.
#[tokio::test]
async fn test_12_backend_auth_failure_is_tool_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri());
    let resp = send(&handler, tool_call(1, "get_contexts", json!({}))).await;

    assert_eq!(resp["result"]["isError"], true);
    assert!(tool_text(&resp).contains("Unauthorized"));

    println!("TEST 12 — Backend 401 as Tool Result: PASS");
}

/// Test 13: Two concurrent add_file calls for one filename — a single POST.
#[tokio::test]
async fn test_13_concurrent_add_file_single_post() {
    let server = MockServer::start().await;

    // The winner's pre-create existence check sees an empty project once;
    // every later listing shows the created file.
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_json(vec![])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(vec![file_json("shared.md")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/contexts/{PROJECT}/files")))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json("shared.md")))
        .expect(1)
        .mount(&server)
        .await;

    let handler = Arc::new(handler_for(&server.uri()));
    let args = json!({ "filename": "shared.md", "content": "# Shared" });

    let a = {
        let handler = Arc::clone(&handler);
        let call = tool_call(1, "add_file", args.clone());
        tokio::spawn(async move { send(&handler, call).await })
    };
    let b = {
        let handler = Arc::clone(&handler);
        let call = tool_call(2, "add_file", args.clone());
        tokio::spawn(async move { send(&handler, call).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    let mut statuses = Vec::new();
    for resp in [&a, &b] {
        assert!(resp.get("error").is_none(), "both calls succeed: {resp}");
        assert!(resp["result"].get("isError").is_none());
        let payload: Value = serde_json::from_str(tool_text(resp)).unwrap();
        assert_eq!(payload["file"]["filename"], "shared.md");
        statuses.push(payload["status"].as_str().unwrap().to_string());
    }
    statuses.sort();
    assert_eq!(statuses, vec!["added", "already exists"]);

    println!("TEST 13 — Concurrent add_file Single POST: PASS");
}

/// Test 14: generate_initial_context defaults its filename and type.
#[tokio::test]
async fn test_14_generate_initial_context_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_json(vec![])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/contexts/{PROJECT}/files")))
        .and(wiremock::matchers::body_partial_json(json!({
            "filename": "initial-context.md",
            "fileType": "markdown"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(file_json("initial-context.md")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri());
    let resp = send(
        &handler,
        tool_call(1, "generate_initial_context", json!({ "content": "# Project" })),
    )
    .await;

    let payload: Value = serde_json::from_str(tool_text(&resp)).unwrap();
    assert_eq!(payload["status"], "added");

    println!("TEST 14 — generate_initial_context Defaults: PASS");
}

// ═══════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════

/// Test 15: resources/list and resources/read round trip.
#[tokio::test]
async fn test_15_resources_list_and_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(vec![file_json("notes.md")])),
        )
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri());

    let resp = send(&handler, mcp_request(1, "resources/list", json!({}))).await;
    let uri = resp["result"]["resources"][0]["uri"].as_str().unwrap();
    assert_eq!(uri, format!("contexthub://projects/{PROJECT}/files"));

    let resp = send(
        &handler,
        mcp_request(2, "resources/read", json!({ "uri": uri })),
    )
    .await;
    let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
    let listing: Value = serde_json::from_str(text).unwrap();
    assert_eq!(listing["files"][0]["filename"], "notes.md");

    // A URI outside the scheme is the caller's mistake.
    let resp = send(
        &handler,
        mcp_request(3, "resources/read", json!({ "uri": "nope://what" })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);

    println!("TEST 15 — Resources List And Read: PASS");
}

/// Test 16: Backend failure during resources/read is a protocol error.
#[tokio::test]
async fn test_16_resource_read_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/contexts/{PROJECT}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri());
    let resp = send(
        &handler,
        mcp_request(
            1,
            "resources/read",
            json!({ "uri": format!("contexthub://projects/{PROJECT}/files") }),
        ),
    )
    .await;

    assert_eq!(
        resp["error"]["code"], -32603,
        "resource reads have no in-band error channel: {resp}"
    );

    println!("TEST 16 — Resource Read Backend Failure: PASS");
}

/// Test 17: Cancellation notifications are inert.
#[tokio::test]
async fn test_17_cancellation_is_inert() {
    let server = MockServer::start().await;
    let handler = handler_for(&server.uri());

    notify(
        &handler,
        "notifications/cancelled",
        Some(json!({ "requestId": 5, "reason": "user changed their mind" })),
    )
    .await;

    // The session is untouched and requests still flow.
    let resp = send(&handler, mcp_request(1, "ping", json!({}))).await;
    assert_eq!(resp["result"], json!({}));

    println!("TEST 17 — Cancellation Inert: PASS");
}
