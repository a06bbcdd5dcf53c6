//! Canonicalization of provider payloads.
//!
//! Providers hand back numbers in whatever representation their SDK chose
//! and timestamps in more than one textual form. Everything the pipeline
//! serializes downstream goes through `normalize_value` first:
//!
//! - floats with no fractional part collapse to plain integers
//! - strings that parse as RFC 3339 or RFC 2822 timestamps are re-rendered
//!   in one canonical RFC 3339 UTC form
//! - sequences and mappings are normalized recursively

use chrono::{DateTime, SecondsFormat, Utc};
use guardpost_capabilities::{EntityRecord, Finding};
use serde_json::{Map, Value};

/// Largest magnitude an f64 can hold while still representing every integer
/// below it exactly (2^53).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Recursively canonicalize a payload value.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT {
                        return Value::from(f as i64);
                    }
                }
            }
            Value::Number(n)
        }
        Value::String(s) => match canonical_timestamp(&s) {
            Some(ts) => Value::String(ts),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key, normalize_value(item));
            }
            Value::Object(out)
        }
        other => other,
    }
}

/// Canonicalize a finding's provider detail payload.
pub fn normalize_finding(mut finding: Finding) -> Finding {
    finding.detail = normalize_value(finding.detail);
    finding
}

/// Canonicalize an entity record's attributes.
pub fn normalize_entity(mut entity: EntityRecord) -> EntityRecord {
    entity.attributes = normalize_value(entity.attributes);
    entity
}

fn canonical_timestamp(s: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| DateTime::parse_from_rfc2822(s).ok())?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}
