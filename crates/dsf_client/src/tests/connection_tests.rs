use super::*;
use serde_json::{json, Value};
use shared::protocol::PROTOCOL_VERSION;
use std::time::Duration;
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

fn init_message() -> InterceptInitMessage {
    InterceptInitMessage::new(InterceptionMode::Pre, &[CodeChannel::File], &["G0", "G1"])
}

async fn connected() -> (InterceptConnection<DuplexStream>, JsonStream<DuplexStream>) {
    let (client, server) = duplex(64 * 1024);
    let mut controller = JsonStream::new(server);
    controller
        .write(&ServerInitMessage {
            version: PROTOCOL_VERSION,
            id: 3,
        })
        .await
        .expect("server init");
    controller
        .write(&BaseResponse::ok())
        .await
        .expect("init response");

    let connection = InterceptConnection::handshake(client, init_message())
        .await
        .expect("handshake");
    let init: Value = controller.read().await.expect("init message");
    assert_eq!(init["mode"], "Intercept");
    (connection, controller)
}

fn file_move() -> Value {
    json!({
        "channel": "File",
        "filePosition": 120,
        "type": "G",
        "majorNumber": 1,
        "parameters": [
            {"letter": "X", "value": 14.0},
            {"letter": "E", "value": 2.0}
        ]
    })
}

#[tokio::test]
async fn handshake_announces_channels_and_filters() {
    let (client, server) = duplex(64 * 1024);
    let mut controller = JsonStream::new(server);
    controller
        .write(&json!({"version": PROTOCOL_VERSION, "id": 9}))
        .await
        .expect("server init");
    controller
        .write(&json!({"success": true}))
        .await
        .expect("init response");

    let connection = InterceptConnection::handshake(client, init_message())
        .await
        .expect("handshake");
    assert_eq!(connection.server_version(), PROTOCOL_VERSION);
    assert_eq!(connection.connection_id(), 9);

    let init: Value = controller.read().await.expect("init message");
    assert_eq!(init["interceptionMode"], "Pre");
    assert_eq!(init["channels"], json!(["File"]));
    assert_eq!(init["filters"], json!(["G0", "G1"]));
}

#[tokio::test]
async fn handshake_refuses_outdated_server() {
    let (client, server) = duplex(1024);
    let mut controller = JsonStream::new(server);
    controller
        .write(&json!({"version": MIN_PROTOCOL_VERSION - 1, "id": 1}))
        .await
        .expect("server init");

    let err = InterceptConnection::handshake(client, init_message())
        .await
        .err()
        .expect("old server must be refused");
    assert!(matches!(
        err,
        DsfError::IncompatibleVersion { server, required }
            if server == MIN_PROTOCOL_VERSION - 1 && required == MIN_PROTOCOL_VERSION
    ));
}

#[tokio::test]
async fn handshake_surfaces_rejected_init() {
    let (client, server) = duplex(1024);
    let mut controller = JsonStream::new(server);
    controller
        .write(&json!({"version": PROTOCOL_VERSION, "id": 1}))
        .await
        .expect("server init");
    controller
        .write(&BaseResponse::failed("ArgumentException", "unsupported channel"))
        .await
        .expect("rejection");

    let err = InterceptConnection::handshake(client, init_message())
        .await
        .err()
        .expect("rejected init");
    match err {
        DsfError::Rejected {
            error_type,
            message,
        } => {
            assert_eq!(error_type, "ArgumentException");
            assert_eq!(message, "unsupported channel");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn receive_then_ignore() {
    let (mut connection, mut controller) = connected().await;
    controller.write(&file_move()).await.expect("code");

    let cancel = CancelToken::new();
    let code = connection
        .receive_code(&cancel)
        .await
        .expect("receive")
        .expect("code before cancel");
    assert_eq!(code.file_position, Some(120));
    assert_eq!(code.float('X'), Some(14.0));

    connection.ignore_code().await.expect("ignore");
    let command: Value = controller.read().await.expect("command");
    assert_eq!(command, json!({"command": "Ignore"}));
}

#[tokio::test]
async fn cancel_code_sends_cancel() {
    let (mut connection, mut controller) = connected().await;
    connection.cancel_code().await.expect("cancel");
    let command: Value = controller.read().await.expect("command");
    assert_eq!(command, json!({"command": "Cancel"}));
}

#[tokio::test]
async fn perform_code_waits_for_the_result_and_resolve_needs_none() {
    let (mut connection, mut controller) = connected().await;
    controller
        .write(&json!({
            "success": true,
            "result": {"type": "Warning", "content": "axis not homed"}
        }))
        .await
        .expect("code response");

    let code = Code::gcode(1).with_parameter('X', 12.0);
    let result = connection.perform_code(&code).await.expect("perform");
    assert_eq!(
        result,
        Some(Message {
            kind: MessageType::Warning,
            content: "axis not homed".into(),
        })
    );

    connection
        .resolve_code(MessageType::Success, "")
        .await
        .expect("resolve");

    let performed: Value = controller.read().await.expect("performed");
    assert_eq!(performed["command"], "Code");
    assert_eq!(performed["code"]["parameters"][0]["value"], 12.0);
    let resolved: Value = controller.read().await.expect("resolved");
    assert_eq!(
        resolved,
        json!({"command": "Resolve", "type": "Success", "content": ""})
    );
}

#[tokio::test]
async fn perform_code_without_result_is_none() {
    let (mut connection, mut controller) = connected().await;
    controller
        .write(&json!({"success": true, "result": null}))
        .await
        .expect("code response");

    let result = connection
        .perform_code(&Code::gcode(0))
        .await
        .expect("perform");
    assert!(result.is_none());
}

#[tokio::test]
async fn perform_code_rejection_is_fatal() {
    let (mut connection, mut controller) = connected().await;
    controller
        .write(&BaseResponse::failed("InvalidOperationException", "not intercepting"))
        .await
        .expect("code response");

    let err = connection
        .perform_code(&Code::gcode(1))
        .await
        .expect_err("rejected code");
    assert!(matches!(err, DsfError::Rejected { .. }));
}

#[tokio::test]
async fn cancel_interrupts_receive_without_losing_partial_input() {
    let (mut connection, controller) = connected().await;
    let mut raw = controller.into_inner();

    let text = serde_json::to_string(&file_move()).expect("json");
    let (head, tail) = text.split_at(text.len() / 2);
    raw.write_all(head.as_bytes()).await.expect("head");

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
    }
    let received = tokio::time::timeout(Duration::from_secs(5), connection.receive_code(&cancel))
        .await
        .expect("receive must not hang")
        .expect("receive");
    assert!(received.is_none());

    raw.write_all(tail.as_bytes()).await.expect("tail");
    let code = connection
        .receive_code(&CancelToken::new())
        .await
        .expect("receive")
        .expect("code");
    assert_eq!(code.float('X'), Some(14.0));
}

#[tokio::test]
async fn closed_session_is_an_error() {
    let (mut connection, controller) = connected().await;
    drop(controller);

    let err = connection
        .receive_code(&CancelToken::new())
        .await
        .expect_err("closed");
    assert!(matches!(err, DsfError::ConnectionClosed));
}
