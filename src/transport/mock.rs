//! Mock session channel for testing.
//!
//! [`MockConnector`] hands out [`MockChannel`]s that answer every scan with
//! a configured JSON response or error, without any network access. State
//! is shared between the connector and its channels so tests can inspect
//! what happened after a session has been closed.

use crate::core::{ByteStream, ScanError, ScanOptions, ScannerConfig};
use crate::transport::{BoxedChannel, Connector, ScanChannel};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::io::AsyncReadExt;

/// Canned reply for a mock scan.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this JSON document.
    Json(Value),
    /// Fail the call with this transport message.
    Error(String),
}

#[derive(Debug)]
struct MockState {
    reply: RwLock<MockReply>,
    connect_error: RwLock<Option<String>>,
    close_error: RwLock<Option<String>>,
    connect_count: AtomicU64,
    scan_count: AtomicU64,
    close_count: AtomicU64,
    bytes_received: AtomicU64,
    last_file_name: RwLock<Option<String>>,
    last_options: RwLock<Option<ScanOptions>>,
}

/// A connector producing mock channels.
///
/// # Examples
///
/// ```rust
/// use blobscan::transport::MockConnector;
///
/// // Every scan reports zero detections
/// let connector = MockConnector::new_clean();
///
/// // Every scan reports one signature-engine detection
/// let connector = MockConnector::new_infected(1);
///
/// // Every scan fails at the transport level
/// let connector = MockConnector::new_clean().with_error("connection reset");
/// ```
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// Creates a connector whose channels reply with `response`.
    pub fn new(response: Value) -> Self {
        Self {
            state: Arc::new(MockState {
                reply: RwLock::new(MockReply::Json(response)),
                connect_error: RwLock::new(None),
                close_error: RwLock::new(None),
                connect_count: AtomicU64::new(0),
                scan_count: AtomicU64::new(0),
                close_count: AtomicU64::new(0),
                bytes_received: AtomicU64::new(0),
                last_file_name: RwLock::new(None),
                last_options: RwLock::new(None),
            }),
        }
    }

    /// Channels report zero detections on both engines.
    pub fn new_clean() -> Self {
        Self::new(session_response(0, 0))
    }

    /// Channels report `count` detections on the signature engine.
    pub fn new_infected(count: u64) -> Self {
        Self::new(session_response(count, 0))
    }

    /// Makes every scan fail with a transport error.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.set_reply(MockReply::Error(message.into()));
        self
    }

    /// Makes `connect` fail.
    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        store(&self.state.connect_error, Some(message.into()));
        self
    }

    /// Makes `close` fail.
    pub fn with_close_error(self, message: impl Into<String>) -> Self {
        store(&self.state.close_error, Some(message.into()));
        self
    }

    /// Replaces the reply used by all channels, including open ones.
    pub fn set_reply(&self, reply: MockReply) {
        store(&self.state.reply, reply);
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> u64 {
        self.state.connect_count.load(Ordering::Relaxed)
    }

    /// Number of scans received.
    pub fn scan_count(&self) -> u64 {
        self.state.scan_count.load(Ordering::Relaxed)
    }

    /// Number of close calls received.
    pub fn close_count(&self) -> u64 {
        self.state.close_count.load(Ordering::Relaxed)
    }

    /// Total bytes read from streams and files.
    pub fn bytes_received(&self) -> u64 {
        self.state.bytes_received.load(Ordering::Relaxed)
    }

    /// File name sent with the most recent scan.
    pub fn last_file_name(&self) -> Option<String> {
        load(&self.state.last_file_name)
    }

    /// Options sent with the most recent scan.
    pub fn last_options(&self) -> Option<ScanOptions> {
        load(&self.state.last_options)
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new_clean()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _config: &ScannerConfig) -> Result<BoxedChannel, ScanError> {
        if let Some(message) = load(&self.state.connect_error) {
            return Err(ScanError::transport(message));
        }
        self.state.connect_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MockChannel {
            state: Arc::clone(&self.state),
        }))
    }
}

/// Channel handed out by [`MockConnector`].
#[derive(Debug)]
pub struct MockChannel {
    state: Arc<MockState>,
}

impl MockChannel {
    fn record(&self, file_name: &str, options: ScanOptions, bytes: u64) -> Result<Value, ScanError> {
        self.state.scan_count.fetch_add(1, Ordering::Relaxed);
        self.state.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        store(&self.state.last_file_name, Some(file_name.to_string()));
        store(&self.state.last_options, Some(options));

        match load(&self.state.reply) {
            MockReply::Json(value) => Ok(value),
            MockReply::Error(message) => Err(ScanError::transport(message)),
        }
    }
}

#[async_trait]
impl ScanChannel for MockChannel {
    fn endpoint(&self) -> &str {
        "mock://scanner"
    }

    async fn scan_stream(
        &self,
        mut stream: ByteStream,
        file_name: &str,
        options: ScanOptions,
    ) -> Result<Value, ScanError> {
        let mut sink = Vec::new();
        let read = stream.read_to_end(&mut sink).await?;
        self.record(file_name, options, read as u64)
    }

    async fn scan_file(&self, path: &Path, options: ScanOptions) -> Result<Value, ScanError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ScanError::from_io(path, e))?;
        self.record(&path.display().to_string(), options, data.len() as u64)
    }

    async fn close(&self) -> Result<(), ScanError> {
        self.state.close_count.fetch_add(1, Ordering::Relaxed);
        match load(&self.state.close_error) {
            Some(message) => Err(ScanError::SessionClose { message }),
            None => Ok(()),
        }
    }
}

fn store<T>(slot: &RwLock<T>, value: T) {
    *slot.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
}

fn load<T: Clone>(slot: &RwLock<T>) -> T {
    slot.read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Session-channel response with the given engine counts.
pub fn session_response(atse: u64, trendx: u64) -> Value {
    json!({
        "scannerVersion": "mock-1.0",
        "result": {
            "atse": {"malwareCount": atse, "error": 0},
            "trendx": {"malwareCount": trendx, "error": 0}
        }
    })
}
