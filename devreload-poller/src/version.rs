//! Version identifiers and the baseline a poller compares against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A server version identifier.
///
/// Development servers publish either a build hash (`"abc123"`) or a rebuild
/// counter (`3`). Comparison is strict across kinds: `Text("1")` never equals
/// `Number(1)`. Integers compare exactly; once a float is involved numbers
/// compare by value, so `1` equals `1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Number(serde_json::Number),
    Text(String),
}

impl Version {
    /// Build a text version
    pub fn text(value: impl Into<String>) -> Self {
        Version::Text(value.into())
    }

    /// Build a numeric version from an integer counter
    pub fn counter(value: u64) -> Self {
        Version::Number(value.into())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Version::Text(a), Version::Text(b)) => a == b,
            (Version::Number(a), Version::Number(b)) => numbers_equal(a, b),
            _ => false,
        }
    }
}

/// Integers compare exactly; a float on either side compares as f64
fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    if a.is_f64() || b.is_f64() {
        return match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
    }
    // A negative integer against one above i64::MAX
    false
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Number(n) => write!(f, "{n}"),
            Version::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Version::Text(value.to_string())
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Version::Text(value)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Version::counter(value)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    /// Parse a version as given on a command line.
    ///
    /// JSON string and number literals keep their kind (`42` is a number,
    /// `"42"` is text). Anything else is taken as text. Surrounding
    /// whitespace is dropped in both cases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match serde_json::from_str::<Version>(trimmed) {
            Ok(version) => Ok(version),
            Err(_) => Ok(Version::Text(trimmed.to_string())),
        }
    }
}

/// The version a poller was started with.
///
/// Set once at construction and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionState {
    baseline: Version,
}

impl VersionState {
    pub fn new(baseline: impl Into<Version>) -> Self {
        Self {
            baseline: baseline.into(),
        }
    }

    /// The version the poller was loaded with
    pub fn baseline(&self) -> &Version {
        &self.baseline
    }

    /// Whether a freshly fetched version differs from the baseline
    pub fn is_outdated_by(&self, fetched: &Version) -> bool {
        self.baseline != *fetched
    }
}

/// Body returned by the version endpoint. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    pub version: Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Version::text("abc123"), Version::text("abc123"), true)]
    #[case(Version::text("abc123"), Version::text("def456"), false)]
    #[case(Version::counter(3), Version::counter(3), true)]
    #[case(Version::counter(3), Version::counter(4), false)]
    #[case(Version::text("1"), Version::counter(1), false)]
    fn test_version_equality(#[case] a: Version, #[case] b: Version, #[case] equal: bool) {
        assert_eq!(a == b, equal);
        assert_eq!(b == a, equal);
    }

    #[test]
    fn test_integer_and_float_numbers_compare_by_value() {
        let int: Version = serde_json::from_str("1").unwrap();
        let float: Version = serde_json::from_str("1.0").unwrap();
        assert_eq!(int, float);
    }

    #[test]
    fn test_large_integer_counters_compare_exactly() {
        let a: Version = serde_json::from_str("9007199254740993").unwrap();
        let b: Version = serde_json::from_str("9007199254740992").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, Version::counter(9_007_199_254_740_993));

        let max: Version = serde_json::from_str("18446744073709551615").unwrap();
        let negative: Version = serde_json::from_str("-1").unwrap();
        assert_ne!(max, negative);
        assert_eq!(negative, serde_json::from_str::<Version>("-1.0").unwrap());
    }

    #[rstest]
    #[case("42", Version::counter(42))]
    #[case("\"42\"", Version::text("42"))]
    #[case("abc123", Version::text("abc123"))]
    #[case("\"abc123\"", Version::text("abc123"))]
    #[case(" abc ", Version::text("abc"))]
    #[case(" 42 ", Version::counter(42))]
    fn test_version_from_str(#[case] input: &str, #[case] expected: Version) {
        let parsed: Version = input.parse().unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_version_response_ignores_extra_fields() {
        let body = r#"{"version":"abc123","built_at":"2024-01-01","pages":12}"#;
        let response: VersionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.version, Version::text("abc123"));
    }

    #[test]
    fn test_version_response_rejects_missing_or_null_version() {
        assert!(serde_json::from_str::<VersionResponse>(r#"{"build":1}"#).is_err());
        assert!(serde_json::from_str::<VersionResponse>(r#"{"version":null}"#).is_err());
        assert!(serde_json::from_str::<VersionResponse>(r#"{"version":[1]}"#).is_err());
    }

    #[test]
    fn test_version_state_detects_change() {
        let state = VersionState::new("abc123");
        assert!(!state.is_outdated_by(&Version::text("abc123")));
        assert!(state.is_outdated_by(&Version::text("def456")));
        assert_eq!(state.baseline(), &Version::text("abc123"));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::text("abc").to_string(), "\"abc\"");
        assert_eq!(Version::counter(7).to_string(), "7");
    }
}
