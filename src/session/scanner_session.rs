//! The scanner session implementation.

use crate::audit::{self, ScanAuditEvent};
use crate::core::result::{
    DETAIL_FILE_NAME, DETAIL_FILE_PATH, DETAIL_FILE_SIZE, DETAIL_MALWARE_COUNT,
    DETAIL_ORIGINAL_FILENAME, DETAIL_RAW_RESULTS,
};
use crate::core::{
    normalize, CountingReader, ScanError, ScanOptions, ScanResult, ScanStrategy, ScannerConfig,
};
use crate::session::clock::MonotonicClock;
use crate::transport::upload::{self, HttpUploader};
use crate::transport::{build_http_client, BoxedChannel, Connector, RpcConnector, ScanChannel};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::Instrument;
use uuid::Uuid;

/// An open logical connection to the scanning backend.
///
/// A session validates its configuration on construction, acquires a
/// backend handle on [`connect`](Self::connect) and releases it on
/// [`close`](Self::close). Scan operations on a session without a handle
/// return [`ScanError::NotConnected`].
///
/// Every other scan failure is reported inside the returned
/// [`ScanResult`]; only `Configuration` and `NotConnected` come back as
/// `Err`.
///
/// The handle is a single connection. Use one session per concurrent caller.
///
/// # Example
///
/// ```rust,ignore
/// use blobscan::{ScannerConfig, ScannerSession};
///
/// let config = ScannerConfig::from_env()?;
/// let result = ScannerSession::new(config)?
///     .scoped(|session| Box::pin(async move { session.scan_file("upload.bin").await }))
///     .await??;
///
/// if result.is_clean() {
///     println!("clean");
/// }
/// ```
#[derive(Debug)]
pub struct ScannerSession {
    config: ScannerConfig,
    connector: Arc<dyn Connector>,
    channel: Option<BoxedChannel>,
    uploader: Option<HttpUploader>,
    clock: MonotonicClock,
    span: tracing::Span,
}

impl ScannerSession {
    /// Creates an unconnected session, validating `config`.
    pub fn new(config: ScannerConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let span = tracing::info_span!(
            "scanner_session",
            region = %config.region(),
            tls = config.tls()
        );

        Ok(Self {
            config,
            connector: Arc::new(RpcConnector),
            channel: None,
            uploader: None,
            clock: MonotonicClock::new(),
            span,
        })
    }

    /// Creates a session and connects it.
    pub async fn open(config: ScannerConfig) -> Result<Self, ScanError> {
        let mut session = Self::new(config)?;
        session.connect().await?;
        Ok(session)
    }

    /// Replaces the connector used to acquire the session channel.
    pub fn with_connector<C: Connector + 'static>(mut self, connector: C) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns `true` while a backend handle is held.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Acquires the backend handle. Does nothing if already connected.
    pub async fn connect(&mut self) -> Result<(), ScanError> {
        if self.channel.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let span = self.span.clone();
        async {
            let client = build_http_client(&self.config).await?;
            let channel = self.connector.connect(&self.config).await?;

            audit::emit_session_opened(self.config.region(), channel.endpoint(), self.config.tls());

            self.uploader = Some(HttpUploader::with_client(client, &self.config));
            self.channel = Some(channel);
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Releases the backend handle.
    ///
    /// Safe to call any number of times. A failing release is logged and
    /// otherwise ignored.
    pub async fn close(&mut self) {
        let Some(channel) = self.channel.take() else {
            return;
        };
        self.uploader = None;

        let released = match channel.close().instrument(self.span.clone()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(parent: &self.span, error = %e, "Error closing scanner handle");
                false
            }
        };

        audit::emit_session_closed(self.config.region(), released);
    }

    /// Connects, runs `work`, and closes the session on every exit path.
    ///
    /// The handle is released exactly once, even if `work` panics; the
    /// panic is resumed after the release.
    pub async fn scoped<F, T>(mut self, work: F) -> Result<T, ScanError>
    where
        F: for<'a> FnOnce(&'a ScannerSession) -> BoxFuture<'a, T>,
    {
        self.connect().await?;
        let outcome = AssertUnwindSafe(work(&self)).catch_unwind().await;
        self.close().await;

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Uploads a local file with a multipart POST.
    ///
    /// `display_name` is sent as the upload's filename and falls back to the
    /// path's base name.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        display_name: Option<&str>,
    ) -> Result<ScanResult, ScanError> {
        let path = path.as_ref();
        self.config.validate()?;
        let uploader = self.uploader.as_ref().ok_or(ScanError::NotConnected)?;

        let strategy = ScanStrategy::HttpUpload;
        let name = upload::display_name(path, display_name);
        let scan_id = Uuid::new_v4().to_string();

        async {
            audit::emit_scan_started(&scan_id, strategy, &name);
            tracing::info!(
                scan_id = %scan_id,
                path = %path.display(),
                file_name = %name,
                url = %uploader.url(),
                "Uploading file for scanning"
            );

            let raw = uploader.upload(path, &name).await;

            let mut details = Map::new();
            details.insert(DETAIL_FILE_PATH.into(), path.display().to_string().into());
            details.insert(DETAIL_ORIGINAL_FILENAME.into(), name.clone().into());
            if let Ok(metadata) = tokio::fs::metadata(path).await {
                details.insert(DETAIL_FILE_SIZE.into(), metadata.len().into());
            }

            self.finish(&scan_id, strategy, &name, raw, details)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Scans a local file over the session channel.
    ///
    /// A missing file fails immediately without contacting the backend.
    pub async fn scan_file(&self, path: impl AsRef<Path>) -> Result<ScanResult, ScanError> {
        let path = path.as_ref();
        self.config.validate()?;
        let channel = self.channel()?;

        let strategy = ScanStrategy::LocalFileRpc;
        let file = path.display().to_string();
        let scan_id = Uuid::new_v4().to_string();

        async {
            audit::emit_scan_started(&scan_id, strategy, &file);

            let raw = match tokio::fs::try_exists(path).await {
                Ok(true) => channel.scan_file(path, ScanOptions::default()).await,
                _ => Err(ScanError::file_not_found(path)),
            };

            let mut details = Map::new();
            details.insert(DETAIL_FILE_PATH.into(), file.clone().into());
            if let Ok(metadata) = tokio::fs::metadata(path).await {
                details.insert(DETAIL_FILE_SIZE.into(), metadata.len().into());
            }

            self.finish(&scan_id, strategy, &file, raw, details)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Streams `stream` to the backend over the session channel.
    pub async fn scan_stream<R>(&self, stream: R, file_name: &str) -> Result<ScanResult, ScanError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.config.validate()?;
        let channel = self.channel()?;

        let strategy = ScanStrategy::StreamingRpc;
        let scan_id = Uuid::new_v4().to_string();

        async {
            audit::emit_scan_started(&scan_id, strategy, file_name);

            let (reader, counter) = CountingReader::new(stream);
            let raw = channel
                .scan_stream(Box::new(reader), file_name, ScanOptions::default())
                .await;

            let mut details = Map::new();
            details.insert(DETAIL_FILE_NAME.into(), file_name.into());
            details.insert(
                DETAIL_FILE_SIZE.into(),
                counter.load(Ordering::Relaxed).into(),
            );

            self.finish(&scan_id, strategy, file_name, raw, details)
        }
        .instrument(self.span.clone())
        .await
    }

    fn channel(&self) -> Result<&dyn ScanChannel, ScanError> {
        self.channel.as_deref().ok_or(ScanError::NotConnected)
    }

    // Turns a raw transport outcome into the envelope handed to the caller.
    fn finish(
        &self,
        scan_id: &str,
        strategy: ScanStrategy,
        file: &str,
        raw: Result<Value, ScanError>,
        mut details: Map<String, Value>,
    ) -> Result<ScanResult, ScanError> {
        let verdict = raw.and_then(|raw| {
            let verdict = normalize(strategy.profile(), &raw)?;
            Ok((raw, verdict))
        });

        let result = match verdict {
            Ok((raw, verdict)) => {
                details.insert(DETAIL_RAW_RESULTS.into(), raw);
                details.insert(DETAIL_MALWARE_COUNT.into(), verdict.malware_count().into());
                if !verdict.is_clean() {
                    tracing::warn!(
                        scan_id = %scan_id,
                        file = %file,
                        malware_count = verdict.malware_count(),
                        "Malware detected"
                    );
                }
                ScanResult::completed_at(&verdict, details, self.clock.now())
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(
                    scan_id = %scan_id,
                    strategy = %strategy,
                    file = %file,
                    error = %e,
                    "Scan failed"
                );
                ScanResult::failed_at(e.to_string(), self.clock.now())
            }
        };

        audit::emit_scan_completed(&ScanAuditEvent::from_result(scan_id, strategy, file, &result));
        Ok(result)
    }
}

impl Drop for ScannerSession {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::warn!(
                parent: &self.span,
                endpoint = %channel.endpoint(),
                "Scanner session dropped without close"
            );
        }
    }
}
