//! Multipart upload transport.
//!
//! Posts a local file to the region-scoped scan endpoint in a single
//! request:
//!
//! ```text
//! POST https://{region}.api.insight.rapid7.com/ias/v1/scan
//! X-Api-Key: {api_key}
//! Content-Type: multipart/form-data; boundary=...
//!
//! file=<bytes>; filename="{display name}"; type=application/octet-stream
//! ```
//!
//! No retries happen here.

use crate::core::{ScanError, ScannerConfig};
use crate::transport::{read_json_response, request_error};

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::Path;

const API_KEY_HEADER: &str = "X-Api-Key";
const FILE_FIELD: &str = "file";
const OCTET_STREAM: &str = "application/octet-stream";

/// Response field overwritten with the display name.
pub const FILE_NAME_FIELD: &str = "fileName";

/// Client for the multipart upload endpoint.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
}

impl HttpUploader {
    /// Creates an uploader that reuses an existing client.
    pub fn with_client(client: reqwest::Client, config: &ScannerConfig) -> Self {
        Self {
            client,
            url: config.upload_url(),
            api_key: config.api_key().clone(),
        }
    }

    /// Endpoint uploads are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Streams `path` under `display_name` and returns the parsed response.
    ///
    /// When the response is a JSON object its `fileName` is set to
    /// `display_name`, since the backend may echo a temporary name.
    pub async fn upload(&self, path: &Path, display_name: &str) -> Result<Value, ScanError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ScanError::from_io(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| ScanError::from_io(path, e))?
            .len();

        tracing::debug!(
            url = %self.url,
            file_name = %display_name,
            size = size,
            "Posting multipart scan request"
        );

        let part = Part::stream_with_length(reqwest::Body::from(file), size)
            .file_name(display_name.to_string())
            .mime_str(OCTET_STREAM)
            .map_err(|e| ScanError::transport(format!("failed to build multipart body: {e}")))?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(&self.url, e))?;

        let mut body = read_json_response(response).await?;
        if let Some(object) = body.as_object_mut() {
            object.insert(
                FILE_NAME_FIELD.to_string(),
                Value::String(display_name.to_string()),
            );
        }
        Ok(body)
    }
}

/// Name sent with an upload: the explicit name, else the path's base name.
pub fn display_name(path: &Path, name: Option<&str>) -> String {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_explicit_name() {
        let path = Path::new("/tmp/upload-3f9a.bin");
        assert_eq!(display_name(path, Some("report.pdf")), "report.pdf");
    }

    #[test]
    fn test_display_name_falls_back_to_base_name() {
        let path = Path::new("/tmp/upload-3f9a.bin");
        assert_eq!(display_name(path, None), "upload-3f9a.bin");
        assert_eq!(display_name(path, Some("")), "upload-3f9a.bin");
    }

    fn uploader(config: &ScannerConfig) -> HttpUploader {
        HttpUploader::with_client(reqwest::Client::new(), config)
    }

    #[test]
    fn test_uploader_uses_configured_url() {
        let config = ScannerConfig::new("eu-1", "key");
        let uploader = uploader(&config);
        assert_eq!(
            uploader.url(),
            "https://eu-1.api.insight.rapid7.com/ias/v1/scan"
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let config = ScannerConfig::new("eu-1", "key");
        let err = uploader(&config)
            .upload(Path::new("/definitely/not/here.txt"), "here.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound { .. }));
    }
}
