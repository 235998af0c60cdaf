//! Canonical Encoder: the single byte representation every hash is taken over.
//!
//! Ledger, verifier and resealer all go through `encode_event`; nothing else
//! in the workspace is allowed to produce hash input.
//!
//! Canonical form is compact `serde_json` output with these rules:
//!
//! - object keys sorted bytewise at every depth
//! - payload values normalized first (see `EventValue::normalized`): integral
//!   floats are integers, null mapping entries are absent
//! - the eight hashed top-level fields are always present; absent optional
//!   strings are written as `null`

use serde_json::{Map, Value};

use forensic_contracts::{event::EventFields, value::EventValue};

/// Encode the hashed field set of one event.
///
/// Pure and deterministic: equal logical input always yields equal bytes.
pub fn encode_event(fields: &EventFields<'_>) -> Vec<u8> {
    let mut object = Map::new();
    object.insert("eventData".to_string(), fields.event_data.normalized().to_json());
    object.insert("eventType".to_string(), Value::from(fields.event_type));
    object.insert("externalRef".to_string(), opt_str(fields.external_ref));
    object.insert("ipAddress".to_string(), opt_str(fields.ip_address));
    object.insert("orderId".to_string(), Value::from(fields.order_id.as_str()));
    object.insert("prevHash".to_string(), Value::from(fields.prev_hash));
    object.insert("sequenceNumber".to_string(), Value::from(fields.sequence_number));
    object.insert("userAgent".to_string(), opt_str(fields.user_agent));

    to_bytes(sort_json(Value::Object(object)))
}

/// Encode a standalone payload value in canonical form.
pub fn encode_value(value: &EventValue) -> Vec<u8> {
    to_bytes(sort_json(value.normalized().to_json()))
}

fn opt_str(s: Option<&str>) -> Value {
    s.map(Value::from).unwrap_or(Value::Null)
}

/// Rebuild every object with its keys in bytewise order, so the output does
/// not depend on how `serde_json::Map` is backed.
fn sort_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            let mut sorted = Map::new();
            for (key, val) in entries {
                sorted.insert(key, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}

// `Display` for `Value` is serde_json's compact writer. A tree of string keys
// and finite numbers always serializes, so there is no error to carry.
fn to_bytes(value: Value) -> Vec<u8> {
    value.to_string().into_bytes()
}
