use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use arjun_mcp_rs::{
    config::ServerConfig,
    mcp::{McpHandler, TOOL_NAME},
    server::router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn app(config: &ServerConfig) -> Router {
    router(
        McpHandler::new(config.invoker(), CancellationToken::new()),
        &config.path,
    )
}

async fn post(app: Router, body: Value) -> (StatusCode, Option<Value>) {
    let resp = app
        .oneshot(
            Request::post("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint() {
    let resp = app(&ServerConfig::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn tools_list_over_http() {
    let (status, body) = post(
        app(&ServerConfig::default()),
        json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["result"]["tools"][0]["name"], TOOL_NAME);
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let (status, body) = post(
        app(&ServerConfig::default()),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_none());
}

#[tokio::test]
async fn null_id_request_gets_a_response() {
    let (status, body) = post(
        app(&ServerConfig::default()),
        json!({ "jsonrpc": "2.0", "id": null, "method": "tools/list" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.expect("response body");
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["result"]["tools"][0]["name"], TOOL_NAME);
}

#[tokio::test]
async fn missing_target_reported_as_tool_error() {
    let (status, body) = post(
        app(&ServerConfig::default()),
        json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": { "name": TOOL_NAME, "arguments": { "url": "", "wordlist": "w.txt" } }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = &body.unwrap()["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["_meta"]["errorKind"], "invalid_argument");
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("'url' or 'textFile'"));
}

#[tokio::test]
async fn strict_mode_rejects_negative_rate_limit() {
    let config = ServerConfig {
        strict: true,
        ..Default::default()
    };
    let (_, body) = post(
        app(&config),
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": { "name": TOOL_NAME, "arguments": { "url": "http://a", "rateLimit": -1 } }
        }),
    )
    .await;
    assert_eq!(body.unwrap()["result"]["_meta"]["errorKind"], "invalid_argument");
}

#[tokio::test]
async fn missing_scanner_binary() {
    let config = ServerConfig {
        program: "arjun-binary-that-does-not-exist-4f1c".into(),
        ..Default::default()
    };
    let (_, body) = post(
        app(&config),
        json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": { "name": TOOL_NAME, "arguments": { "url": "http://a" } }
        }),
    )
    .await;
    let result = &body.unwrap()["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["_meta"]["errorKind"], "binary_not_found");
}

#[cfg(unix)]
#[tokio::test]
async fn scan_output_and_exit_code_over_http() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    let bin = dir.path().join("arjun");
    std::fs::write(
        &bin,
        "#!/bin/sh\nif [ \"$1\" = \"-f\" ]; then echo 'cannot read list' >&2; exit 3; fi\necho \"found: $2\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    let config = ServerConfig {
        program: bin.to_string_lossy().into_owned(),
        ..Default::default()
    };

    let (_, body) = post(
        app(&config),
        json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": { "name": TOOL_NAME, "arguments": { "url": "http://a/" } }
        }),
    )
    .await;
    let result = &body.unwrap()["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["text"], "found: http://a/");

    let (_, body) = post(
        app(&config),
        json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": { "name": TOOL_NAME, "arguments": { "textFile": "urls.txt" } }
        }),
    )
    .await;
    let result = &body.unwrap()["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["_meta"]["errorKind"], "external_tool_error");
    assert_eq!(result["_meta"]["exitCode"], 3);
    assert_eq!(
        result["content"][0]["text"],
        format!("{} exited with code 3: cannot read list", config.program)
    );
}
