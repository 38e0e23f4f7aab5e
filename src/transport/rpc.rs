//! Session channel transport.
//!
//! The channel is bound to the region-scoped endpoint when the session
//! connects and is reused for every scan until it is closed. Uploads are
//! streamed; nothing is buffered in memory.
//!
//! # Protocol
//!
//! ```text
//! POST {endpoint}/api/v1/scan?file_name=..&pml=true&verbose=true&digest=true
//! Authorization: ApiKey {api_key}
//! Content-Type: application/octet-stream
//!
//! <streamed bytes>
//! ```

use crate::core::{ByteStream, ScanError, ScanOptions, ScannerConfig};
use crate::transport::{
    build_http_client, read_json_response, request_error, BoxedChannel, Connector, ScanChannel,
};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::io::ReaderStream;

const SCAN_PATH: &str = "/api/v1/scan";

/// Opens [`RpcChannel`]s against the configured region.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcConnector;

#[async_trait]
impl Connector for RpcConnector {
    async fn connect(&self, config: &ScannerConfig) -> Result<BoxedChannel, ScanError> {
        config.validate()?;
        let client = build_http_client(config).await?;
        Ok(Box::new(RpcChannel::new(
            client,
            config.rpc_url(),
            config.api_key().clone(),
        )))
    }
}

/// A channel to the session endpoint.
#[derive(Debug)]
pub struct RpcChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    closed: AtomicBool,
}

impl RpcChannel {
    /// Creates a channel bound to `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            closed: AtomicBool::new(false),
        }
    }

    fn scan_url(&self) -> String {
        format!("{}{SCAN_PATH}", self.endpoint)
    }

    async fn submit(
        &self,
        body: reqwest::Body,
        file_name: &str,
        options: ScanOptions,
    ) -> Result<Value, ScanError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ScanError::transport(format!(
                "channel to {} is closed",
                self.endpoint
            )));
        }

        let url = self.scan_url();
        let response = self
            .client
            .post(&url)
            .header(
                AUTHORIZATION,
                format!("ApiKey {}", self.api_key.expose_secret()),
            )
            .header(CONTENT_TYPE, "application/octet-stream")
            .query(&[("file_name", file_name)])
            .query(&options.as_query())
            .body(body)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        read_json_response(response).await
    }
}

#[async_trait]
impl ScanChannel for RpcChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn scan_stream(
        &self,
        stream: ByteStream,
        file_name: &str,
        options: ScanOptions,
    ) -> Result<Value, ScanError> {
        let body = reqwest::Body::wrap_stream(ReaderStream::new(stream));
        self.submit(body, file_name, options).await
    }

    async fn scan_file(&self, path: &Path, options: ScanOptions) -> Result<Value, ScanError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ScanError::from_io(path, e))?;
        let file_name = path.display().to_string();
        self.submit(reqwest::Body::from(file), &file_name, options)
            .await
    }

    async fn close(&self) -> Result<(), ScanError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ScanError::SessionClose {
                message: format!("channel to {} already closed", self.endpoint),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> RpcChannel {
        RpcChannel::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            SecretString::from("key".to_string()),
        )
    }

    #[test]
    fn test_scan_url() {
        assert_eq!(channel().scan_url(), "http://127.0.0.1:1/api/v1/scan");
    }

    #[tokio::test]
    async fn test_connector_rejects_invalid_config() {
        let err = RpcConnector
            .connect(&ScannerConfig::new("", "key"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_connector_binds_region_endpoint() {
        let channel = RpcConnector
            .connect(&ScannerConfig::new("us-1", "key"))
            .await
            .unwrap();
        assert_eq!(
            channel.endpoint(),
            "https://antimalware.us-1.cloudone.trendmicro.com"
        );
    }

    #[tokio::test]
    async fn test_close_twice_reports_error() {
        let channel = channel();
        assert!(channel.close().await.is_ok());
        assert!(matches!(
            channel.close().await,
            Err(ScanError::SessionClose { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_scans() {
        let channel = channel();
        channel.close().await.unwrap();
        let err = channel
            .scan_stream(Box::new(&b"data"[..]), "a.txt", ScanOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn test_scan_file_missing_path() {
        let err = channel()
            .scan_file(Path::new("/no/such/file"), ScanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound { .. }));
    }
}
