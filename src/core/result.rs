//! The scan result envelope.
//!
//! A [`ScanResult`] is created once per scan call and never mutated. The
//! clean flag is derived from a [`Verdict`]; a failure envelope is never
//! clean.

use crate::core::verdict::Verdict;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Detail key holding the raw backend response.
pub const DETAIL_RAW_RESULTS: &str = "raw_results";
/// Detail key holding the summed malware count.
pub const DETAIL_MALWARE_COUNT: &str = "malware_count";
/// Detail key holding the local file path.
pub const DETAIL_FILE_PATH: &str = "file_path";
/// Detail key holding the stream or display name.
pub const DETAIL_FILE_NAME: &str = "file_name";
/// Detail key holding the name sent with a multipart upload.
pub const DETAIL_ORIGINAL_FILENAME: &str = "original_filename";
/// Detail key holding the size in bytes.
pub const DETAIL_FILE_SIZE: &str = "file_size";

/// Canonical outcome of one scan call.
///
/// # Examples
///
/// ```rust
/// use blobscan::ScanResult;
///
/// let result = ScanResult::failed("File not found: /tmp/x");
/// assert!(!result.is_clean());
/// assert_eq!(result.error(), Some("File not found: /tmp/x"));
/// assert!(result.details().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScanResultRecord")]
pub struct ScanResult {
    is_clean: bool,
    details: Map<String, Value>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

impl ScanResult {
    /// Creates a successful envelope from a verdict.
    pub fn completed(verdict: &Verdict, details: Map<String, Value>) -> Self {
        Self::completed_at(verdict, details, Utc::now())
    }

    /// Creates a failure envelope. Details are empty.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::failed_at(error, Utc::now())
    }

    pub(crate) fn completed_at(
        verdict: &Verdict,
        details: Map<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            is_clean: verdict.is_clean(),
            details,
            error: None,
            timestamp,
        }
    }

    pub(crate) fn failed_at(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_clean: false,
            details: Map::new(),
            error: Some(error.into()),
            timestamp,
        }
    }

    /// Returns `true` if every consulted engine reported zero detections.
    pub fn is_clean(&self) -> bool {
        self.is_clean
    }

    /// Returns `true` if the scan produced a verdict (no error).
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Structured details: raw response and call-site metadata.
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Failure message, if the scan failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// When the result was captured.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Summed malware count, when a verdict was reached.
    pub fn malware_count(&self) -> Option<u64> {
        self.details.get(DETAIL_MALWARE_COUNT).and_then(Value::as_u64)
    }

    /// Flat mapping of `is_clean`, `details`, `error` and `timestamp` for
    /// collaborators.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("is_clean".into(), Value::Bool(self.is_clean));
        map.insert("details".into(), Value::Object(self.details.clone()));
        map.insert(
            "error".into(),
            self.error.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(
            "timestamp".into(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        map
    }
}

/// Wire shape accepted when deserializing an envelope.
#[derive(Deserialize)]
struct ScanResultRecord {
    is_clean: bool,
    #[serde(default)]
    details: Map<String, Value>,
    #[serde(default)]
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<ScanResultRecord> for ScanResult {
    type Error = String;

    fn try_from(record: ScanResultRecord) -> Result<Self, Self::Error> {
        if record.error.is_some() && record.is_clean {
            return Err("a scan result carrying an error cannot be clean".to_string());
        }
        Ok(Self {
            is_clean: record.is_clean,
            details: record.details,
            error: record.error,
            timestamp: record.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::verdict::{normalize, SESSION_PROFILE};
    use serde_json::json;

    fn verdict(raw: Value) -> Verdict {
        normalize(&SESSION_PROFILE, &raw).unwrap()
    }

    #[test]
    fn test_completed_clean() {
        let v = verdict(json!({"result": {"atse": {"malwareCount": 0}}}));
        let mut details = Map::new();
        details.insert(DETAIL_MALWARE_COUNT.into(), json!(0));

        let result = ScanResult::completed(&v, details);
        assert!(result.is_clean());
        assert!(result.is_success());
        assert_eq!(result.malware_count(), Some(0));
    }

    #[test]
    fn test_completed_infected() {
        let v = verdict(json!({"result": {"atse": {"malwareCount": 1}, "trendx": {"malwareCount": 0}}}));
        let result = ScanResult::completed(&v, Map::new());
        assert!(!result.is_clean());
        assert!(result.error().is_none());
    }

    #[test]
    fn test_failed_is_never_clean() {
        let result = ScanResult::failed("connection refused");
        assert!(!result.is_clean());
        assert!(!result.is_success());
        assert!(result.details().is_empty());
        assert!(result.malware_count().is_none());
    }

    #[test]
    fn test_serde_round_trip_preserves_fields() {
        let v = verdict(json!({"result": {"atse": {"malwareCount": 2}}}));
        let mut details = Map::new();
        details.insert(DETAIL_FILE_NAME.into(), json!("eicar.txt"));
        details.insert(DETAIL_RAW_RESULTS.into(), json!({"result": {"atse": {"malwareCount": 2}}}));
        let original = ScanResult::completed(&v, details);

        let text = serde_json::to_string(&original).unwrap();
        let back: ScanResult = serde_json::from_str(&text).unwrap();

        assert_eq!(back.is_clean(), original.is_clean());
        assert_eq!(back.error(), original.error());
        assert_eq!(back.details(), original.details());
        assert_eq!(back.timestamp(), original.timestamp());
    }

    #[test]
    fn test_to_map_matches_serialized_form() {
        let original = ScanResult::failed("Scan failed with status 403: denied");
        let map = original.to_map();

        assert_eq!(map["is_clean"], json!(false));
        assert_eq!(map["error"], json!("Scan failed with status 403: denied"));
        assert_eq!(map["details"], json!({}));

        let back: ScanResult = serde_json::from_value(Value::Object(map)).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_deserialize_rejects_clean_error() {
        let raw = json!({
            "is_clean": true,
            "details": {},
            "error": "boom",
            "timestamp": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<ScanResult>(raw).is_err());
    }
}
