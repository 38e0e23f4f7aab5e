//! Verdict normalization.
//!
//! Backends report detections per engine under `result.<engine>.malwareCount`.
//! Which engines are summed, and what an absent count means, depends on the
//! transport that produced the response. Those rules live in a
//! [`VerdictProfile`]; [`normalize`] applies one to a raw JSON response.

use crate::core::error::ScanError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One engine sub-report consulted by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineReport {
    /// Key under `result` (e.g. `atse`).
    pub engine: &'static str,
    /// Count assumed when the engine's `malwareCount` is absent.
    pub missing_count: u64,
}

/// How a response that is not a JSON object is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonObjectPolicy {
    /// Counts as zero detections.
    Clean,
    /// Rejected as a parse failure.
    Reject,
}

/// Engine set and defaults used to turn a raw response into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictProfile {
    /// Engine sub-reports whose counts are summed.
    pub engines: &'static [EngineReport],
    /// Treatment of non-object responses.
    pub non_object: NonObjectPolicy,
}

/// Multipart uploads: only the signature engine is reported, and a missing
/// count is not trusted as clean.
pub const UPLOAD_PROFILE: VerdictProfile = VerdictProfile {
    engines: &[EngineReport {
        engine: "atse",
        missing_count: 1,
    }],
    non_object: NonObjectPolicy::Reject,
};

/// Session channel scans: signature and heuristic engines, absent sub-reports
/// count as zero.
pub const SESSION_PROFILE: VerdictProfile = VerdictProfile {
    engines: &[
        EngineReport {
            engine: "atse",
            missing_count: 0,
        },
        EngineReport {
            engine: "trendx",
            missing_count: 0,
        },
    ],
    non_object: NonObjectPolicy::Clean,
};

/// Detections reported by a single engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCount {
    /// Engine key.
    pub engine: String,
    /// Malware count used in the total.
    pub malware_count: u64,
    /// Whether the count was taken from the profile default.
    pub defaulted: bool,
}

/// Normalized verdict: per-engine counts and their total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    engines: Vec<EngineCount>,
    total: u64,
}

impl Verdict {
    /// Sum of malware counts across all consulted engines.
    pub fn malware_count(&self) -> u64 {
        self.total
    }

    /// `true` iff no engine reported malware.
    pub fn is_clean(&self) -> bool {
        self.total == 0
    }

    /// Per-engine breakdown.
    pub fn engines(&self) -> &[EngineCount] {
        &self.engines
    }
}

/// Applies `profile` to a raw backend response.
///
/// A `malwareCount` that is present but not a non-negative integer is a
/// parse failure; it never silently counts as clean.
pub fn normalize(profile: &VerdictProfile, raw: &Value) -> Result<Verdict, ScanError> {
    let Some(root) = raw.as_object() else {
        return match profile.non_object {
            NonObjectPolicy::Clean => Ok(Verdict {
                engines: Vec::new(),
                total: 0,
            }),
            NonObjectPolicy::Reject => Err(ScanError::parse(format!(
                "expected a JSON object, got {}",
                kind_of(raw)
            ))),
        };
    };

    let result = root.get("result");
    let mut engines = Vec::with_capacity(profile.engines.len());
    let mut total: u64 = 0;

    for report in profile.engines {
        let count = result
            .and_then(|r| r.get(report.engine))
            .and_then(|e| e.get("malwareCount"));

        let (malware_count, defaulted) = match count {
            None | Some(Value::Null) => (report.missing_count, true),
            Some(value) => {
                let n = value.as_u64().ok_or_else(|| {
                    ScanError::parse(format!(
                        "malwareCount for engine '{}' is not a non-negative integer: {value}",
                        report.engine
                    ))
                })?;
                (n, false)
            }
        };

        total = total.saturating_add(malware_count);
        engines.push(EngineCount {
            engine: report.engine.to_string(),
            malware_count,
            defaulted,
        });
    }

    Ok(Verdict { engines, total })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_profile_sums_engines() {
        let raw = json!({"result": {"atse": {"malwareCount": 1}, "trendx": {"malwareCount": 2}}});
        let verdict = normalize(&SESSION_PROFILE, &raw).unwrap();
        assert_eq!(verdict.malware_count(), 3);
        assert!(!verdict.is_clean());
    }

    #[test]
    fn test_session_profile_zero_counts_are_clean() {
        let raw = json!({"result": {"atse": {"malwareCount": 0}, "trendx": {"malwareCount": 0}}});
        assert!(normalize(&SESSION_PROFILE, &raw).unwrap().is_clean());
    }

    #[test]
    fn test_session_profile_absent_subreport_counts_zero() {
        let raw = json!({"result": {"atse": {"malwareCount": 0}}});
        let verdict = normalize(&SESSION_PROFILE, &raw).unwrap();
        assert!(verdict.is_clean());
        assert!(verdict.engines()[1].defaulted);

        let verdict = normalize(&SESSION_PROFILE, &json!({})).unwrap();
        assert!(verdict.is_clean());
    }

    #[test]
    fn test_session_profile_heuristic_detection() {
        let raw = json!({"result": {"atse": {"malwareCount": 0}, "trendx": {"malwareCount": 1}}});
        assert!(!normalize(&SESSION_PROFILE, &raw).unwrap().is_clean());
    }

    #[test]
    fn test_session_profile_non_object_is_clean() {
        assert!(normalize(&SESSION_PROFILE, &json!("ok")).unwrap().is_clean());
        assert!(normalize(&SESSION_PROFILE, &Value::Null).unwrap().is_clean());
    }

    #[test]
    fn test_upload_profile_missing_count_is_not_clean() {
        let verdict = normalize(&UPLOAD_PROFILE, &json!({"result": {}})).unwrap();
        assert_eq!(verdict.malware_count(), 1);
        assert!(!verdict.is_clean());

        let verdict = normalize(&UPLOAD_PROFILE, &json!({"fileName": "a.txt"})).unwrap();
        assert!(!verdict.is_clean());
    }

    #[test]
    fn test_upload_profile_ignores_heuristic_engine() {
        let raw = json!({"result": {"atse": {"malwareCount": 0}, "trendx": {"malwareCount": 4}}});
        assert!(normalize(&UPLOAD_PROFILE, &raw).unwrap().is_clean());
    }

    #[test]
    fn test_upload_profile_rejects_non_object() {
        let err = normalize(&UPLOAD_PROFILE, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_non_integer_count_is_parse_error() {
        let raw = json!({"result": {"atse": {"malwareCount": "0"}}});
        assert!(normalize(&SESSION_PROFILE, &raw).is_err());
        let raw = json!({"result": {"atse": {"malwareCount": -1}}});
        assert!(normalize(&UPLOAD_PROFILE, &raw).is_err());
    }
}
