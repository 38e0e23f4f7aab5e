//! Transport adapters that talk to the scanning backend.
//!
//! Two transports exist:
//!
//! - [`upload`] - one-shot multipart POST of a local file
//! - [`rpc`] - a long-lived session channel that accepts streamed uploads
//!   and local paths
//!
//! Both return the raw JSON response; turning it into a verdict is the job
//! of [`crate::core::verdict`]. [`mock`] provides an in-process channel for
//! tests.
//!
//! ## Implementing a Custom Channel
//!
//! ```rust,ignore
//! use blobscan::transport::{BoxedChannel, Connector, ScanChannel};
//! use blobscan::core::{ByteStream, ScanError, ScanOptions, ScannerConfig};
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use std::path::Path;
//!
//! #[derive(Debug)]
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     async fn connect(&self, config: &ScannerConfig) -> Result<BoxedChannel, ScanError> {
//!         // Open a handle to the region-scoped backend...
//!         todo!()
//!     }
//! }
//! ```

pub mod mock;
pub mod rpc;
pub mod upload;

pub use mock::{MockChannel, MockConnector};
pub use rpc::{RpcChannel, RpcConnector};
pub use upload::HttpUploader;

use crate::core::{ByteStream, CaCertificate, ScanError, ScanOptions, ScannerConfig};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::path::Path;

/// An open handle to the scanning backend.
///
/// A channel is a single logical connection. It is not meant to be shared
/// by concurrent scans.
#[async_trait]
pub trait ScanChannel: Send + Sync + Debug {
    /// Endpoint this channel is bound to, for logging.
    fn endpoint(&self) -> &str;

    /// Scans a byte stream, returning the raw backend response.
    async fn scan_stream(
        &self,
        stream: ByteStream,
        file_name: &str,
        options: ScanOptions,
    ) -> Result<Value, ScanError>;

    /// Scans a local file, returning the raw backend response.
    async fn scan_file(&self, path: &Path, options: ScanOptions) -> Result<Value, ScanError>;

    /// Releases the handle.
    async fn close(&self) -> Result<(), ScanError>;
}

/// A boxed channel for type-erased storage.
pub type BoxedChannel = Box<dyn ScanChannel>;

/// Opens channels for a configuration.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    /// Acquires a channel to the region-scoped backend.
    async fn connect(&self, config: &ScannerConfig) -> Result<BoxedChannel, ScanError>;
}

/// Builds the HTTP client shared by both transports.
pub(crate) async fn build_http_client(config: &ScannerConfig) -> Result<reqwest::Client, ScanError> {
    let mut builder =
        reqwest::Client::builder().user_agent(concat!("blobscan/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }

    if let Some(ca_cert) = config.ca_cert() {
        let pem = match ca_cert {
            CaCertificate::Path(path) => tokio::fs::read(path).await.map_err(|e| {
                ScanError::configuration(format!(
                    "failed to read CA certificate {}: {e}",
                    path.display()
                ))
            })?,
            CaCertificate::Pem(bytes) => bytes.clone(),
        };
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| ScanError::configuration(format!("invalid CA certificate: {e}")))?;
        builder = builder.add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|e| ScanError::configuration(format!("failed to create HTTP client: {e}")))
}

/// Maps a request failure, keeping the underlying message.
pub(crate) fn request_error(url: &str, err: reqwest::Error) -> ScanError {
    if err.is_timeout() {
        ScanError::transport(format!("request to {url} timed out: {err}"))
    } else if err.is_connect() {
        ScanError::transport(format!("connection to {url} failed: {err}"))
    } else {
        ScanError::transport(format!("request to {url} failed: {err}"))
    }
}

/// Reads a 200 response as JSON; any other status is an error.
pub(crate) async fn read_json_response(response: reqwest::Response) -> Result<Value, ScanError> {
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(ScanError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScanError::transport(format!("failed to read response body: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| ScanError::parse(e.to_string()))
}
