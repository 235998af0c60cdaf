//! # forensic-contracts
//!
//! Shared types, payload values, and error contracts for the forensic order
//! event chain.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, payload normalization and error types.

pub mod error;
pub mod event;
pub mod evidence;
pub mod order;
pub mod report;
pub mod value;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use error::LedgerError;
    use event::{event_types, NewEvent, OrderId};
    use order::{OrderRecord, OrderStatus};
    use report::VerifyReport;
    use value::EventValue;

    // ── EventValue normalization ─────────────────────────────────────────────

    #[test]
    fn integral_float_normalizes_to_integer() {
        assert_eq!(EventValue::Float(1.0).normalized(), EventValue::Integer(1));
        assert_eq!(EventValue::Float(-42.0).normalized(), EventValue::Integer(-42));
        assert_eq!(EventValue::Float(1.5).normalized(), EventValue::Float(1.5));
    }

    #[test]
    fn non_finite_float_normalizes_to_null() {
        assert!(EventValue::Float(f64::NAN).normalized().is_null());
        assert!(EventValue::Float(f64::INFINITY).normalized().is_null());
    }

    #[test]
    fn null_map_entries_are_dropped() {
        let with_null = EventValue::from(json!({ "a": 1, "b": null }));
        let without = EventValue::from(json!({ "a": 1 }));
        assert_eq!(with_null.normalized(), without.normalized());
    }

    #[test]
    fn array_nulls_keep_their_position() {
        let value = EventValue::from(json!([1, null, 2]));
        assert_eq!(
            value.normalized(),
            EventValue::Array(vec![
                EventValue::Integer(1),
                EventValue::Null,
                EventValue::Integer(2)
            ])
        );
    }

    #[test]
    fn from_json_collapses_integral_floats() {
        assert_eq!(EventValue::from(json!(7.0)), EventValue::Integer(7));
        assert_eq!(EventValue::from(json!(7)), EventValue::Integer(7));
    }

    #[test]
    fn event_value_deserializes_from_plain_json() {
        let value: EventValue =
            serde_json::from_str(r#"{"amount": 1999, "currency": "EUR", "tags": [true, 0.5]}"#)
                .unwrap();

        assert_eq!(value.get("amount").and_then(EventValue::as_i64), Some(1999));
        assert_eq!(value.get("currency").and_then(EventValue::as_str), Some("EUR"));
        assert_eq!(
            value.get("tags"),
            Some(&EventValue::Array(vec![
                EventValue::Bool(true),
                EventValue::Float(0.5)
            ]))
        );
    }

    #[test]
    fn event_value_serializes_as_plain_json() {
        let value = EventValue::map([("k", EventValue::from("v")), ("n", EventValue::from(3i64))]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"k":"v","n":3}"#);
    }

    // ── NewEvent validation ──────────────────────────────────────────────────

    #[test]
    fn well_known_event_types_validate() {
        for tag in [
            event_types::ORDER_CREATED,
            event_types::TERMS_ACCEPTED,
            event_types::PAYMENT_CAPTURED,
            event_types::ADMIN_DISPUTE_MODE_ACTIVATED,
            event_types::ADMIN_EVIDENCE_PDF_GENERATED,
        ] {
            assert!(NewEvent::new(tag, EventValue::Null).validate().is_ok(), "{tag}");
        }
    }

    #[test]
    fn malformed_event_types_are_rejected() {
        for tag in ["", "created", "Order.Created", "order..created", "order.created ", "order-created"] {
            match NewEvent::new(tag, EventValue::Null).validate() {
                Err(LedgerError::InvalidEvent { .. }) => {}
                other => panic!("expected InvalidEvent for '{tag}', got {:?}", other),
            }
        }
    }

    #[test]
    fn oversized_event_type_is_rejected() {
        let tag = format!("order.{}", "x".repeat(event::MAX_EVENT_TYPE_LEN));
        assert!(NewEvent::new(tag, EventValue::Null).validate().is_err());
    }

    // ── Order ────────────────────────────────────────────────────────────────

    #[test]
    fn new_order_is_not_frozen() {
        let order = OrderRecord::new(OrderId::from("ord-1"), OrderStatus::Paid);
        assert!(!order.is_frozen());
        assert!(!order.downloads_revoked);
    }

    // ── Report wire shape ────────────────────────────────────────────────────

    #[test]
    fn verify_report_uses_camel_case() {
        let report = VerifyReport {
            valid: false,
            total_events: 3,
            first_invalid_sequence: Some(2),
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(
            json,
            json!({ "valid": false, "totalEvents": 3, "firstInvalidSequence": 2 })
        );
    }

    // ── LedgerError ──────────────────────────────────────────────────────────

    #[test]
    fn error_status_codes_are_distinct_for_boundary_kinds() {
        let not_found = LedgerError::NotFound { order_id: "o".to_string() };
        let conflict = LedgerError::ConcurrencyConflict { order_id: "o".to_string(), attempts: 5 };
        let storage = LedgerError::StorageFailure { reason: "down".to_string() };

        assert_eq!(not_found.status_code(), 404);
        assert_eq!(conflict.status_code(), 503);
        assert_eq!(storage.status_code(), 500);
        assert!(conflict.is_transient());
        assert!(!storage.is_transient());
    }

    #[test]
    fn error_concurrency_conflict_display() {
        let err = LedgerError::ConcurrencyConflict {
            order_id: "ord-9".to_string(),
            attempts: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("ord-9"));
        assert!(msg.contains("5 attempt"));
    }

    #[test]
    fn error_freeze_conflict_display() {
        let err = LedgerError::FreezeConflict {
            order_id: "ord-3".to_string(),
            reason: "evidence already frozen".to_string(),
        };
        assert!(err.to_string().contains("evidence already frozen"));
    }
}
