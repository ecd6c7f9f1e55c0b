//! Serde helpers shared by the configuration types

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `Duration` as integer milliseconds
///
/// Configuration files name these fields with an `_ms` suffix.
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use serde::{Deserialize, Serialize};
/// use taiga_mcp_common::duration_millis;
///
/// #[derive(Serialize, Deserialize)]
/// struct Limits {
///     #[serde(with = "duration_millis", rename = "wait_timeout_ms")]
///     wait_timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize as milliseconds, saturating at `u64::MAX`
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Limits {
        #[serde(with = "duration_millis", rename = "wait_timeout_ms")]
        wait_timeout: Duration,
    }

    #[test]
    fn test_reads_milliseconds_from_toml() {
        let limits: Limits = toml::from_str("wait_timeout_ms = 2500").unwrap();
        assert_eq!(limits.wait_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_writes_milliseconds_to_json() {
        let json = serde_json::to_string(&Limits { wait_timeout: Duration::from_secs(30) }).unwrap();
        assert_eq!(json, r#"{"wait_timeout_ms":30000}"#);
    }

    /// Validates `duration_millis::serialize` behavior for the overflow
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a duration beyond `u64::MAX` milliseconds saturates.
    #[test]
    fn test_saturates_huge_durations() {
        let json = serde_json::to_string(&Limits { wait_timeout: Duration::MAX }).unwrap();
        assert_eq!(json, format!(r#"{{"wait_timeout_ms":{}}}"#, u64::MAX));
    }

    #[test]
    fn test_rejects_non_numeric_values() {
        assert!(toml::from_str::<Limits>("wait_timeout_ms = \"soon\"").is_err());
        assert!(serde_json::from_str::<Limits>(r#"{"wait_timeout_ms":-1}"#).is_err());
    }
}
