//! End-to-end probes through `reqwest` against a loopback server.

use std::collections::BTreeMap;
use std::sync::Arc;

use httprobe::probe::{ProbeExecutor, ProcNetDev, ReqwestTransport};
use httprobe::{MeasurementError, ProbeSettings, Task, TaskContext, TaskDesc, TaskKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve exactly one connection: capture the request head, reply with `head`
/// followed by `body`, then close.
async fn serve_once(head: String, body: Vec<u8>) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

        // The client may hang up early once it has read enough.
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&body).await;
        let _ = socket.shutdown().await;
    });

    (format!("127.0.0.1:{}", addr.port()), rx)
}

fn ok_head(status: &str, body_len: usize) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Probe: yes\r\nConnection: close\r\n\r\n",
        status, body_len
    )
}

fn context(settings: &ProbeSettings) -> TaskContext {
    let executor = ProbeExecutor::new(
        settings,
        Arc::new(ReqwestTransport::new(settings).unwrap()),
        Arc::new(ProcNetDev::default()),
    );
    TaskContext::new(executor, "test-device")
}

fn task(pairs: &[(&str, &str)]) -> Task {
    let params: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Task::from_desc(
        TaskDesc::new(TaskKind::HttpProbe, "it", params),
        &ProbeSettings::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hello_body_is_captured() {
    let (addr, _request) = serve_once(ok_head("200 OK", 5), b"hello".to_vec()).await;
    let settings = ProbeSettings::default();

    let mut task = task(&[("url", addr.as_str())]);
    let results = task.execute(&context(&settings)).await.unwrap();
    let values = &results[0].values;

    assert_eq!(values["status_code"], 200);
    assert_eq!(values["content_length"], 5);
    assert_eq!(values["body_len"], 5);
    assert_eq!(values["body"], "aGVsbG8=");
    assert!(values["time_ms"].as_u64().is_some());

    let headers = values["headers"].as_str().unwrap();
    assert!(headers.contains("x-probe:yes\n"));
    assert_eq!(values["headers_len"], headers.len());
}

#[tokio::test]
async fn test_request_headers_reach_the_server() {
    let (addr, request) = serve_once(ok_head("200 OK", 0), Vec::new()).await;
    let settings = ProbeSettings::default();

    let mut task = task(&[
        ("url", addr.as_str()),
        ("method", "post"),
        ("headers", "Accept: text/html\nX-Test:1"),
    ]);
    let results = task.execute(&context(&settings)).await.unwrap();
    let values = &results[0].values;
    assert_eq!(values["status_code"], 200);
    assert_eq!(values["body_len"], 0);
    assert!(!values.contains_key("body"));

    let request = request.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("post / http/1.1"));
    assert!(request.contains("accept: text/html\r\n"));
    assert!(request.contains("x-test: 1\r\n"));
}

#[tokio::test]
async fn test_large_body_is_capped() {
    let size = 2 * 1024 * 1024;
    let (addr, _request) = serve_once(ok_head("200 OK", size), vec![b'x'; size]).await;
    let settings = ProbeSettings::default();

    let mut task = task(&[("url", addr.as_str())]);
    let results = task.execute(&context(&settings)).await.unwrap();
    let values = &results[0].values;
    assert_eq!(values["body_len"], 1_048_576);
    assert_eq!(values["content_length"], size);
}

#[tokio::test]
async fn test_error_status_is_reported_not_failed() {
    let (addr, _request) = serve_once(ok_head("404 Not Found", 4), b"gone".to_vec()).await;
    let settings = ProbeSettings::default();

    let mut task = task(&[("url", addr.as_str())]);
    let results = task.execute(&context(&settings)).await.unwrap();
    assert_eq!(results[0].values["status_code"], 404);
}

#[tokio::test]
async fn test_refused_connection_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let settings = ProbeSettings::default();
    let mut task = task(&[("url", format!("127.0.0.1:{}", port).as_str())]);
    let err = task.execute(&context(&settings)).await.unwrap_err();
    assert!(matches!(err, MeasurementError::Measurement(_)));
    assert_eq!(task.data_consumed(), 0);
}

#[tokio::test]
async fn test_bad_header_line_fails_before_connecting() {
    let settings = ProbeSettings::default();
    let mut task = task(&[("url", "127.0.0.1:9"), ("headers", "badheaderline")]);
    let err = task.execute(&context(&settings)).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("Invalid header line: badheaderline"));
}
