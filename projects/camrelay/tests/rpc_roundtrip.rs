use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use camrelay::rpc::{ErrorCode, HandlerError, HandlerResult, Params, RpcClient, RpcClientError, RpcServer};
use serde_json::{Value, json};
use tokio::sync::oneshot;

fn temp_socket_path(tag: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("camrelay-it-{tag}-{suffix}.sock"))
}

async fn echo(params: Params) -> HandlerResult {
    Ok(Value::Object(params))
}

async fn refuse(_params: Params) -> HandlerResult {
    Err(HandlerError::application("camera busy"))
}

#[tokio::test]
async fn client_and_server_round_trip_over_a_socket() {
    let path = temp_socket_path("roundtrip");
    let mut server = RpcServer::new(&path);
    server.register("echo", echo).register("refuse", refuse);
    let bound = server.bind().expect("server should bind");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(bound.run(async move {
        let _ = stop_rx.await;
    }));

    let client = RpcClient::new(&path);
    let echoed = client
        .call("echo", json!({"x": 1}))
        .await
        .expect("echo should succeed");
    assert_eq!(echoed, json!({"x": 1}));

    let empty = client
        .call("echo", Value::Null)
        .await
        .expect("echo without params should succeed");
    assert_eq!(empty, json!({}));

    let err = client
        .call("refuse", json!({}))
        .await
        .expect_err("refuse should fail");
    assert_eq!(err.code(), Some(ErrorCode::ApplicationError));
    match err {
        RpcClientError::Remote { message, .. } => assert_eq!(message, "camera busy"),
        other => panic!("expected remote error, got {other:?}"),
    }

    let missing = client
        .call("nope", json!({}))
        .await
        .expect_err("unknown method should fail");
    assert_eq!(missing.code(), Some(ErrorCode::MethodNotFound));

    stop_tx.send(()).expect("server should still be running");
    serving.await.expect("server task should finish");
    assert!(!path.exists(), "socket file removed on shutdown");
}

#[tokio::test]
async fn client_reports_missing_server_as_connect_error() {
    let client = RpcClient::new(temp_socket_path("absent"));
    let err = client
        .call("echo", json!({}))
        .await
        .expect_err("no server is listening");
    assert!(matches!(err, RpcClientError::Connect { .. }), "{err:?}");
}
