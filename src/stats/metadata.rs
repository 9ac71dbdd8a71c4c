use crate::stats::normalize::parse_or_zero;
use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Monthly listeners are exported either as a bare integer or as an object
/// carrying a `count` next to other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListenerValue {
    Flat(#[serde(deserialize_with = "scalar_count")] u64),
    Nested {
        #[serde(default, deserialize_with = "lenient_count")]
        count: u64,
        #[serde(flatten)]
        extra: BTreeMap<String, Value>,
    },
}

impl Default for ListenerValue {
    fn default() -> Self {
        Self::Flat(0)
    }
}

impl ListenerValue {
    pub fn count(&self) -> u64 {
        match self {
            Self::Flat(count) | Self::Nested { count, .. } => *count,
        }
    }
}

/// Counts from hand-edited exports: floats truncate, numeric strings parse,
/// negatives clamp to 0. Objects and arrays are not counts.
fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Null => Some(0),
        Value::Number(n) => Some(match (n.as_u64(), n.as_f64()) {
            (Some(v), _) => v,
            (None, Some(f)) if f.is_finite() && f > 0.0 => f.trunc() as u64,
            _ => 0,
        }),
        Value::String(s) => Some(parse_or_zero(Some(s))),
        _ => None,
    }
}

fn scalar_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    count_from_value(&value).ok_or_else(|| D::Error::custom("expected a scalar count"))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value).unwrap_or(0))
}

fn required_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Err(D::Error::custom("career_total is null")),
        value => count_from_value(&value)
            .ok_or_else(|| D::Error::custom("career_total is not a number")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    #[serde(deserialize_with = "required_count")]
    pub career_total: u64,
    #[serde(default)]
    pub listeners: ListenerValue,
    #[serde(default, deserialize_with = "lenient_count")]
    pub listeners_rank: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub listeners_peak: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub listeners_pk_count: u64,
}

impl MetaRecord {
    pub fn listener_count(&self) -> u64 {
        self.listeners.count()
    }
}

pub fn read_meta(path: &Path) -> Result<MetaRecord> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: MetaRecord = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_listener_count_parses() {
        let raw = r#"{"career_total": 100, "listeners": 95000000, "listeners_rank": 9}"#;
        let meta: MetaRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(meta.listener_count(), 95_000_000);
        assert_eq!(meta.listeners_rank, 9);
        assert_eq!(meta.listeners_peak, 0);
    }

    #[test]
    fn nested_listener_count_parses_and_keeps_extra_fields() {
        let raw = r#"{"career_total": 1, "listeners": {"count": 42, "source": "web"}}"#;
        let meta: MetaRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(meta.listener_count(), 42);
        let ListenerValue::Nested { extra, .. } = &meta.listeners else {
            panic!("expected nested listeners");
        };
        assert_eq!(extra.get("source"), Some(&Value::from("web")));
    }

    #[test]
    fn missing_listeners_defaults_to_zero() {
        let meta: MetaRecord = serde_json::from_str(r#"{"career_total": 5}"#).expect("parse");
        assert_eq!(meta.listener_count(), 0);
    }

    #[test]
    fn missing_career_total_is_an_error() {
        assert!(serde_json::from_str::<MetaRecord>(r#"{"listeners": 5}"#).is_err());
    }

    #[test]
    fn float_listeners_and_null_ranks_are_coerced() {
        let raw = r#"{"career_total": 5, "listeners": 95000000.0, "listeners_rank": null, "listeners_peak": "3"}"#;
        let meta: MetaRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(meta.listener_count(), 95_000_000);
        assert_eq!(meta.listeners_rank, 0);
        assert_eq!(meta.listeners_peak, 3);
    }

    #[test]
    fn null_listeners_and_float_nested_count_are_coerced() {
        let meta: MetaRecord =
            serde_json::from_str(r#"{"career_total": 1.9, "listeners": null}"#).expect("parse");
        assert_eq!(meta.career_total, 1);
        assert_eq!(meta.listener_count(), 0);

        let raw = r#"{"career_total": 1, "listeners": {"count": 12.7, "source": "web"}, "listeners_pk_count": -4}"#;
        let meta: MetaRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(meta.listener_count(), 12);
        assert_eq!(meta.listeners_pk_count, 0);
    }

    #[test]
    fn null_career_total_is_an_error() {
        assert!(serde_json::from_str::<MetaRecord>(r#"{"career_total": null}"#).is_err());
    }
}
