use super::*;
use serde_json::{json, Value};
use tokio::io::{duplex, AsyncWriteExt};

#[tokio::test]
async fn reads_documents_split_across_writes() {
    let (local, mut remote) = duplex(1024);
    let mut stream = JsonStream::new(local);

    remote.write_all(br#"{"version": 1"#).await.expect("first half");
    let reader = tokio::spawn(async move {
        let value: Value = stream.read().await.expect("document");
        value
    });
    tokio::task::yield_now().await;
    remote.write_all(br#"2, "id": 4}"#).await.expect("second half");

    let value = reader.await.expect("reader task");
    assert_eq!(value, json!({"version": 12, "id": 4}));
}

#[tokio::test]
async fn reads_back_to_back_documents_from_one_write() {
    let (local, mut remote) = duplex(1024);
    let mut stream = JsonStream::new(local);

    remote
        .write_all(b"{\"a\":1}{\"b\":2}\n  {\"c\":3}")
        .await
        .expect("write");

    let first: Value = stream.read().await.expect("first");
    let second: Value = stream.read().await.expect("second");
    let third: Value = stream.read().await.expect("third");
    assert_eq!(first, json!({"a": 1}));
    assert_eq!(second, json!({"b": 2}));
    assert_eq!(third, json!({"c": 3}));
}

#[tokio::test]
async fn malformed_document_is_a_json_error() {
    let (local, mut remote) = duplex(1024);
    let mut stream = JsonStream::new(local);

    remote.write_all(b"{\"a\": ]").await.expect("write");
    let err = stream.read::<Value>().await.expect_err("malformed");
    assert!(matches!(err, DsfError::Json(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn closed_stream_reports_connection_closed() {
    let (local, remote) = duplex(1024);
    let mut stream = JsonStream::new(local);
    drop(remote);

    let err = stream.read::<Value>().await.expect_err("closed");
    assert!(matches!(err, DsfError::ConnectionClosed));
}

#[tokio::test]
async fn writes_compact_json() {
    let (local, remote) = duplex(1024);
    let mut stream = JsonStream::new(local);
    let mut peer = JsonStream::new(remote);

    stream
        .write(&json!({"command": "Ignore"}))
        .await
        .expect("write");
    let echoed: Value = peer.read().await.expect("read");
    assert_eq!(echoed, json!({"command": "Ignore"}));
}
