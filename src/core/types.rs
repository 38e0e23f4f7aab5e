//! Strategy and option types shared by the session and transports.

use crate::core::verdict::{VerdictProfile, SESSION_PROFILE, UPLOAD_PROFILE};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport strategy used for a single scan call.
///
/// The operation the caller invokes picks the strategy:
/// - `HttpUpload` - one-shot multipart POST of a local file
/// - `StreamingRpc` - stream upload over the session channel
/// - `LocalFileRpc` - session channel scan of a local path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Multipart upload over HTTP.
    HttpUpload,
    /// Byte stream over the session channel.
    StreamingRpc,
    /// Local file over the session channel.
    LocalFileRpc,
}

impl ScanStrategy {
    /// Normalization rules for responses produced by this strategy.
    pub fn profile(&self) -> &'static VerdictProfile {
        match self {
            Self::HttpUpload => &UPLOAD_PROFILE,
            Self::StreamingRpc | Self::LocalFileRpc => &SESSION_PROFILE,
        }
    }

    /// Stable name used in logs and audit events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpUpload => "http_upload",
            Self::StreamingRpc => "streaming_rpc",
            Self::LocalFileRpc => "local_file_rpc",
        }
    }
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags sent with every session channel scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Pattern-matching-list scanning.
    pub pml: bool,
    /// Verbose per-engine detail in the response.
    pub verbose: bool,
    /// Ask the backend to compute file digests.
    pub digest: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            pml: true,
            verbose: true,
            digest: true,
        }
    }
}

impl ScanOptions {
    /// Query parameters carrying the flags.
    pub fn as_query(&self) -> [(&'static str, bool); 3] {
        [
            ("pml", self.pml),
            ("verbose", self.verbose),
            ("digest", self.digest),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_profiles() {
        assert_eq!(ScanStrategy::HttpUpload.profile(), &UPLOAD_PROFILE);
        assert_eq!(ScanStrategy::StreamingRpc.profile(), &SESSION_PROFILE);
        assert_eq!(ScanStrategy::LocalFileRpc.profile(), &SESSION_PROFILE);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(ScanStrategy::StreamingRpc.to_string(), "streaming_rpc");
    }

    #[test]
    fn test_default_options_enable_everything() {
        let options = ScanOptions::default();
        assert!(options.pml && options.verbose && options.digest);
        assert_eq!(
            options.as_query(),
            [("pml", true), ("verbose", true), ("digest", true)]
        );
    }
}
