//! Scanner configuration.
//!
//! [`ScannerConfig`] is built once, validated, and never changed after a
//! session takes ownership of it.

use crate::core::error::ScanError;

use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the backend region.
pub const ENV_REGION: &str = "AMAAS_REGION";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "AMAAS_API_KEY";
/// Environment variable toggling TLS for the session channel.
pub const ENV_TLS: &str = "AMAAS_TLS";
/// Environment variable pointing at a PEM CA certificate.
pub const ENV_CA_CERT: &str = "AMAAS_CA_CERT";

const UPLOAD_DOMAIN: &str = "api.insight.rapid7.com";
const UPLOAD_PATH: &str = "/ias/v1/scan";

/// CA certificate used to verify the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaCertificate {
    /// PEM file on disk, read when the session connects.
    Path(PathBuf),
    /// PEM bytes already in memory.
    Pem(Vec<u8>),
}

/// Configuration for a [`ScannerSession`](crate::session::ScannerSession).
///
/// # Examples
///
/// ```rust
/// use blobscan::ScannerConfig;
/// use std::time::Duration;
///
/// let config = ScannerConfig::new("us-1", "secret-key")
///     .with_tls(true)
///     .with_timeout(Duration::from_secs(30));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.region(), "us-1");
/// ```
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    region: String,
    api_key: SecretString,
    tls: bool,
    ca_cert: Option<CaCertificate>,
    upload_endpoint: Option<String>,
    rpc_endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ScannerConfig {
    /// Creates a configuration for `region` authenticated with `api_key`.
    ///
    /// TLS is enabled by default. Nothing is validated until
    /// [`validate`](Self::validate) runs.
    pub fn new(region: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            api_key: SecretString::from(api_key.into()),
            tls: true,
            ca_cert: None,
            upload_endpoint: None,
            rpc_endpoint: None,
            timeout: None,
        }
    }

    /// Reads the configuration from `AMAAS_*` environment variables.
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScanError> {
        let region = lookup(ENV_REGION).unwrap_or_default();
        let api_key = lookup(ENV_API_KEY).unwrap_or_default();
        let mut config = Self::new(region, api_key);

        if let Some(raw) = lookup(ENV_TLS) {
            config.tls = parse_flag(&raw).ok_or_else(|| {
                ScanError::configuration(format!("{ENV_TLS} must be a boolean, got '{raw}'"))
            })?;
        }
        if let Some(path) = lookup(ENV_CA_CERT).filter(|p| !p.trim().is_empty()) {
            config.ca_cert = Some(CaCertificate::Path(PathBuf::from(path)));
        }

        config.validate()?;
        Ok(config)
    }

    /// Enables or disables TLS on the session channel.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the CA certificate used to verify the backend.
    pub fn with_ca_cert(mut self, ca_cert: CaCertificate) -> Self {
        self.ca_cert = Some(ca_cert);
        self
    }

    /// Overrides the full URL used by multipart uploads.
    pub fn with_upload_endpoint(mut self, url: impl Into<String>) -> Self {
        self.upload_endpoint = Some(url.into());
        self
    }

    /// Overrides the base URL of the session channel.
    pub fn with_rpc_endpoint(mut self, url: impl Into<String>) -> Self {
        self.rpc_endpoint = Some(url.into());
        self
    }

    /// Sets a request timeout on the underlying HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Checks that region and API key are present.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.region.trim().is_empty() {
            return Err(ScanError::configuration(format!(
                "{ENV_REGION} environment variable must be set"
            )));
        }
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ScanError::configuration(format!(
                "{ENV_API_KEY} environment variable must be set"
            )));
        }
        Ok(())
    }

    /// Returns the backend region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Returns whether the session channel uses TLS.
    pub fn tls(&self) -> bool {
        self.tls
    }

    /// Returns the configured CA certificate, if any.
    pub fn ca_cert(&self) -> Option<&CaCertificate> {
        self.ca_cert.as_ref()
    }

    /// Returns the configured client timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// URL that multipart uploads are posted to.
    pub fn upload_url(&self) -> String {
        match &self.upload_endpoint {
            Some(url) => url.clone(),
            None => format!("https://{}.{UPLOAD_DOMAIN}{UPLOAD_PATH}", self.region),
        }
    }

    /// Base URL of the region-scoped session channel.
    pub fn rpc_url(&self) -> String {
        match &self.rpc_endpoint {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let scheme = if self.tls { "https" } else { "http" };
                format!("{scheme}://antimalware.{}.cloudone.trendmicro.com", self.region)
            }
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
