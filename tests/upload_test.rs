//! Multipart upload scans against a local HTTP stub.

mod common;

use blobscan::core::result::{
    DETAIL_FILE_SIZE, DETAIL_MALWARE_COUNT, DETAIL_ORIGINAL_FILENAME, DETAIL_RAW_RESULTS,
};
use blobscan::transport::MockConnector;
use blobscan::{ScanError, ScannerConfig, ScannerSession};
use serde_json::json;
use std::io::Write;
use std::net::SocketAddr;

async fn session_for(addr: SocketAddr) -> ScannerSession {
    let config = ScannerConfig::new("us-1", "test-key")
        .with_upload_endpoint(format!("http://{addr}/ias/v1/scan"));
    let mut session = ScannerSession::new(config)
        .unwrap()
        .with_connector(MockConnector::new_clean());
    session.connect().await.unwrap();
    session
}

fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file
}

#[tokio::test]
async fn test_clean_upload() {
    let (addr, request) = common::serve_once(200, r#"{"result":{"atse":{"malwareCount":0}}}"#).await;
    let file = temp_file(b"hello");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), Some("clean.txt")).await.unwrap();

    assert!(result.is_clean());
    assert!(result.error().is_none());
    assert_eq!(result.details()[DETAIL_ORIGINAL_FILENAME], json!("clean.txt"));
    assert_eq!(result.details()[DETAIL_MALWARE_COUNT], json!(0));
    assert_eq!(result.details()[DETAIL_RAW_RESULTS]["fileName"], json!("clean.txt"));

    let request = request.await.unwrap();
    assert!(request.request_line().starts_with("POST /ias/v1/scan"));
    assert_eq!(request.header("x-api-key"), Some("test-key"));
    assert!(request
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));
    let body = request.body_text();
    assert!(body.contains(r#"name="file""#));
    assert!(body.contains(r#"filename="clean.txt""#));
    assert!(body.contains("hello"));

    session.close().await;
}

#[tokio::test]
async fn test_upload_uses_base_name_by_default() {
    let (addr, request) = common::serve_once(200, r#"{"result":{"atse":{"malwareCount":0}}}"#).await;
    let file = temp_file(b"data");
    let base = file.path().file_name().unwrap().to_string_lossy().into_owned();
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), None).await.unwrap();

    assert!(result.is_clean());
    assert_eq!(result.details()[DETAIL_ORIGINAL_FILENAME], json!(base));
    assert!(request
        .await
        .unwrap()
        .body_text()
        .contains(&format!(r#"filename="{base}""#)));

    session.close().await;
}

#[tokio::test]
async fn test_large_upload_is_sent_whole() {
    let (addr, request) = common::serve_once(200, r#"{"result":{"atse":{"malwareCount":0}}}"#).await;
    let mut payload = vec![b'a'; 4 * 1024 * 1024];
    payload.extend_from_slice(b"TAIL-MARKER");
    let file = temp_file(&payload);
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), Some("big.bin")).await.unwrap();

    assert!(result.is_clean());
    assert_eq!(result.details()[DETAIL_FILE_SIZE], json!(payload.len()));

    let request = request.await.unwrap();
    let length: usize = request.header("content-length").unwrap().parse().unwrap();
    assert_eq!(length, request.body.len());
    assert!(request.body.len() > payload.len());
    assert!(request.body_text().contains("TAIL-MARKER"));

    session.close().await;
}

#[tokio::test]
async fn test_upload_infected() {
    let (addr, _request) = common::serve_once(200, r#"{"result":{"atse":{"malwareCount":2}}}"#).await;
    let file = temp_file(b"X5O!P%@AP");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), Some("eicar.com")).await.unwrap();

    assert!(!result.is_clean());
    assert!(result.error().is_none());
    assert_eq!(result.malware_count(), Some(2));

    session.close().await;
}

#[tokio::test]
async fn test_upload_http_error_status() {
    let (addr, _request) = common::serve_once(403, r#"{"message":"Forbidden"}"#).await;
    let file = temp_file(b"hello");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), None).await.unwrap();

    assert!(!result.is_clean());
    let error = result.error().unwrap();
    assert!(error.contains("403"), "{error}");
    assert!(error.contains("Forbidden"), "{error}");
    assert!(result.details().is_empty());

    session.close().await;
}

#[tokio::test]
async fn test_upload_missing_count_is_not_clean() {
    let (addr, _request) = common::serve_once(200, r#"{"result":{}}"#).await;
    let file = temp_file(b"hello");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), None).await.unwrap();

    assert!(!result.is_clean());
    assert!(result.error().is_none());
    assert_eq!(result.malware_count(), Some(1));

    session.close().await;
}

#[tokio::test]
async fn test_upload_invalid_json() {
    let (addr, _request) = common::serve_once(200, "definitely not json").await;
    let file = temp_file(b"hello");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), None).await.unwrap();

    assert!(!result.is_clean());
    assert!(result
        .error()
        .unwrap()
        .starts_with("Failed to parse scan results"));

    session.close().await;
}

#[tokio::test]
async fn test_upload_non_object_response_is_rejected() {
    let (addr, _request) = common::serve_once(200, "[1, 2, 3]").await;
    let file = temp_file(b"hello");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), None).await.unwrap();

    assert!(!result.is_clean());
    assert!(result.error().is_some());

    session.close().await;
}

#[tokio::test]
async fn test_upload_connection_refused() {
    let addr = common::refused_addr().await;
    let file = temp_file(b"hello");
    let mut session = session_for(addr).await;

    let result = session.upload_file(file.path(), None).await.unwrap();

    assert!(!result.is_clean());
    assert!(result.error().is_some());
    assert!(result.details().is_empty());

    session.close().await;
}

#[tokio::test]
async fn test_upload_missing_file() {
    let addr = common::refused_addr().await;
    let mut session = session_for(addr).await;

    let result = session
        .upload_file("/no/such/dir/report.pdf", None)
        .await
        .unwrap();

    assert!(!result.is_clean());
    assert_eq!(result.error(), Some("File not found: /no/such/dir/report.pdf"));

    session.close().await;
}

#[tokio::test]
async fn test_upload_requires_open_session() {
    let config = ScannerConfig::new("us-1", "test-key");
    let session = ScannerSession::new(config).unwrap();

    let err = session.upload_file("/tmp/a.txt", None).await.unwrap_err();
    assert!(matches!(err, ScanError::NotConnected));
}
