//! Blob addressing and the scan request queued for each uploaded blob.

use crate::core::BlobError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a blob lives: storage account, container and blob name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocation {
    /// Storage account, the first label of the host.
    pub account: String,
    /// Container name.
    pub container: String,
    /// Blob name, which may itself contain `/`.
    pub blob: String,
}

impl BlobLocation {
    /// Splits `https://{account}.blob.core.windows.net/{container}/{blob...}`.
    ///
    /// Query strings and fragments (such as a SAS token) are ignored.
    ///
    /// ```rust
    /// use blobscan::blob::BlobLocation;
    ///
    /// let loc = BlobLocation::parse(
    ///     "https://acme.blob.core.windows.net/uploads/2024/report.pdf?sv=x",
    /// ).unwrap();
    /// assert_eq!(loc.account, "acme");
    /// assert_eq!(loc.container, "uploads");
    /// assert_eq!(loc.blob, "2024/report.pdf");
    /// ```
    pub fn parse(url: &str) -> Result<Self, BlobError> {
        let invalid = |reason: &str| BlobError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| invalid("expected an http or https url"))?;

        let rest = rest
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default();

        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let account = host.split('.').next().unwrap_or_default();
        if account.is_empty() {
            return Err(invalid("missing host"));
        }

        let (container, blob) = path.split_once('/').unwrap_or((path, ""));
        if container.is_empty() {
            return Err(invalid("missing container"));
        }
        if blob.is_empty() {
            return Err(invalid("missing blob name"));
        }

        Ok(Self {
            account: account.to_string(),
            container: container.to_string(),
            blob: blob.to_string(),
        })
    }

    /// Blob service endpoint for the account.
    pub fn service_url(&self) -> String {
        format!("https://{}.blob.core.windows.net", self.account)
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service_url(), self.container, self.blob)
    }
}

/// Queue message describing a blob waiting to be scanned.
///
/// `blob_url` is a read URL with any access token already attached; minting
/// that token is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobScanRequest {
    /// Readable URL of the blob.
    pub blob_url: String,
    /// Blob name within the container.
    pub blob_name: String,
    /// Container name.
    pub container: String,
    /// Content type reported by storage.
    pub content_type: Option<String>,
    /// Content length reported by storage.
    pub size: Option<u64>,
    /// When the request was queued.
    pub submitted_at: DateTime<Utc>,
}

impl BlobScanRequest {
    /// Builds a request for `blob_url`, taking the container and blob name
    /// from the URL.
    pub fn new(blob_url: impl Into<String>) -> Result<Self, BlobError> {
        let blob_url = blob_url.into();
        let location = BlobLocation::parse(&blob_url)?;

        Ok(Self {
            blob_url,
            blob_name: location.blob,
            container: location.container,
            content_type: None,
            size: None,
            submitted_at: Utc::now(),
        })
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the content length.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Parses the location of the requested blob.
    pub fn location(&self) -> Result<BlobLocation, BlobError> {
        BlobLocation::parse(&self.blob_url)
    }
}
