//! Writing scan verdicts back onto blobs as metadata and index tags.

use crate::audit::outcome_label;
use crate::blob::BlobLocation;
use crate::core::{BlobError, ScanResult};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Engine name recorded when none is configured.
pub const DEFAULT_ENGINE: &str = "default";
/// Engine version recorded when none is configured.
pub const DEFAULT_VERSION: &str = "1.0";

/// Key/value pairs written to a blob.
pub type Annotations = BTreeMap<String, String>;

/// Verdict status written to a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No detections.
    Clean,
    /// At least one detection.
    Infected,
    /// The scan did not produce a verdict.
    Error,
}

impl ScanStatus {
    /// Returns the status as written to the blob.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Infected => "infected",
            Self::Error => "error",
        }
    }
}

/// Scan outcome in the form stored alongside a blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Verdict status.
    pub status: ScanStatus,
    /// When the verdict was captured.
    pub timestamp: DateTime<Utc>,
    /// Scanning engine name.
    pub engine: String,
    /// Scanning engine version.
    pub version: String,
    /// Detection count, present for infected blobs.
    pub findings: Option<u64>,
}

impl ScanMetadata {
    /// Derives the stored form of `result`.
    pub fn from_result(result: &ScanResult) -> Self {
        let status = match outcome_label(result) {
            "clean" => ScanStatus::Clean,
            "infected" => ScanStatus::Infected,
            _ => ScanStatus::Error,
        };
        let findings = match status {
            ScanStatus::Infected => result.malware_count(),
            _ => None,
        };

        Self {
            status,
            timestamp: result.timestamp(),
            engine: DEFAULT_ENGINE.to_string(),
            version: DEFAULT_VERSION.to_string(),
            findings,
        }
    }

    /// Sets the engine name.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Sets the engine version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Blob metadata: `scanStatus`, `scanTimestamp`, `scanEngine`,
    /// `scanVersion` and, when infected, `scanFindings`.
    pub fn metadata(&self) -> Annotations {
        self.annotate(["scanStatus", "scanTimestamp", "scanEngine", "scanVersion", "scanFindings"])
    }

    /// Blob index tags under the `scan:` prefix.
    pub fn tags(&self) -> Annotations {
        self.annotate([
            "scan:status",
            "scan:timestamp",
            "scan:engine",
            "scan:version",
            "scan:findings",
        ])
    }

    fn annotate(&self, keys: [&str; 5]) -> Annotations {
        let [status, timestamp, engine, version, findings] = keys;

        let mut out = Annotations::new();
        out.insert(status.into(), self.status.as_str().into());
        out.insert(
            timestamp.into(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        out.insert(engine.into(), self.engine.clone());
        out.insert(version.into(), self.version.clone());
        if let Some(count) = self.findings {
            out.insert(findings.into(), count.to_string());
        }
        out
    }
}

/// Sink for blob metadata and tags.
///
/// Implementations talk to a storage service; [`InMemoryMetadataWriter`]
/// keeps everything in process.
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    /// Replaces the blob's metadata.
    async fn set_metadata(
        &self,
        location: &BlobLocation,
        metadata: &Annotations,
    ) -> Result<(), BlobError>;

    /// Replaces the blob's index tags.
    async fn set_tags(&self, location: &BlobLocation, tags: &Annotations) -> Result<(), BlobError>;
}

/// Writes the verdict in `result` onto the blob at `location`.
///
/// Metadata is written first, then tags. The first failure is returned.
pub async fn record_verdict<W>(
    writer: &W,
    location: &BlobLocation,
    result: &ScanResult,
) -> Result<ScanMetadata, BlobError>
where
    W: MetadataWriter + ?Sized,
{
    let record = ScanMetadata::from_result(result);

    writer.set_metadata(location, &record.metadata()).await?;
    writer.set_tags(location, &record.tags()).await?;

    tracing::info!(
        blob = %location,
        status = record.status.as_str(),
        findings = ?record.findings,
        "Recorded scan verdict on blob"
    );
    Ok(record)
}

#[derive(Debug, Default, Clone)]
struct StoredAnnotations {
    metadata: Annotations,
    tags: Annotations,
}

/// A [`MetadataWriter`] that stores annotations in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetadataWriter {
    blobs: RwLock<HashMap<BlobLocation, StoredAnnotations>>,
    fail_tags: bool,
}

impl InMemoryMetadataWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `set_tags` call fail.
    pub fn with_failing_tags(mut self) -> Self {
        self.fail_tags = true;
        self
    }

    /// Metadata last written for `location`.
    pub fn metadata(&self, location: &BlobLocation) -> Option<Annotations> {
        self.read(location).map(|stored| stored.metadata)
    }

    /// Tags last written for `location`.
    pub fn tags(&self, location: &BlobLocation) -> Option<Annotations> {
        self.read(location).map(|stored| stored.tags)
    }

    fn read(&self, location: &BlobLocation) -> Option<StoredAnnotations> {
        self.blobs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(location)
            .cloned()
    }
}

#[async_trait]
impl MetadataWriter for InMemoryMetadataWriter {
    async fn set_metadata(
        &self,
        location: &BlobLocation,
        metadata: &Annotations,
    ) -> Result<(), BlobError> {
        self.blobs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(location.clone())
            .or_default()
            .metadata = metadata.clone();
        Ok(())
    }

    async fn set_tags(&self, location: &BlobLocation, tags: &Annotations) -> Result<(), BlobError> {
        if self.fail_tags {
            return Err(BlobError::WriteFailed {
                target: "tags",
                blob: location.blob.clone(),
                reason: "tag writes disabled".to_string(),
            });
        }
        self.blobs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(location.clone())
            .or_default()
            .tags = tags.clone();
        Ok(())
    }
}
