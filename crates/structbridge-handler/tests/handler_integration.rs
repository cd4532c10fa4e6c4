//! Integration tests for the data handler


use serde_json::{json, Value};
use std::io::Write;
use structbridge_core::{CacheStats, TargetValue};
use structbridge_handler::{DataHandler, HandlerConfig, Protocol};
use tempfile::NamedTempFile;
use test_support::{binding_context, sample_order, Order, ORDER_PAYLOAD};

#[test]
fn test_decode_then_encode_round_trip() {
    let handler = DataHandler::new(HandlerConfig::default()).unwrap();

    let target = handler.decode_str::<Order>(ORDER_PAYLOAD).unwrap().unwrap();
    assert_eq!(target.get("customer").and_then(TargetValue::as_str), Some("Ada"));
    assert_eq!(
        handler.mapper().to_source::<Order>(&target).unwrap(),
        sample_order()
    );

    let payload = handler.encode::<Order>(&target).unwrap();
    let encoded: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(encoded["id"], json!(42));
    assert_eq!(encoded["price"], json!(12.5));
    assert_eq!(encoded["shipping"]["city"], json!("Oslo"));
    assert_eq!(encoded["labels"].as_array().map(Vec::len), Some(2));

    let again = handler.decode::<Order>(&payload).unwrap().unwrap();
    assert_eq!(again, target);
}

#[test]
fn test_simple_json_output_is_compact() {
    let handler =
        DataHandler::from_binding_context(binding_context([("protocol", json!("SIMPLE_JSON"))]))
            .unwrap();
    assert_eq!(handler.config().protocol, Protocol::SimpleJson);

    let target = handler.decode_str::<Order>(ORDER_PAYLOAD).unwrap().unwrap();
    let payload = handler.encode::<Order>(&target).unwrap();
    assert!(!payload.contains(&b'\n'));
}

#[test]
fn test_empty_payload_per_null_policy() {
    let decode_empty = |strategy: &str| {
        DataHandler::from_binding_context(binding_context([(
            "null.handling.strategy",
            json!(strategy),
        )]))
        .unwrap()
        .decode::<Order>(b"   ")
    };

    assert!(decode_empty("preserve").unwrap().is_none());
    assert!(decode_empty("omit").unwrap().is_none());

    let defaulted = decode_empty("default").unwrap().unwrap();
    assert_eq!(defaulted.get("id").and_then(TargetValue::as_i64), Some(0));

    let err = decode_empty("error").unwrap_err();
    assert_eq!(err.code(), "NULL_INPUT_ERROR");
}

#[test]
fn test_missing_fields_under_error_policy() {
    let handler = DataHandler::from_binding_context(binding_context([(
        "null.handling.strategy",
        json!("error"),
    )]))
    .unwrap();

    let err = handler.decode_str::<Order>(r#"{"id": 1}"#).unwrap_err();
    assert_eq!(err.code(), "NULL_INPUT_ERROR");
}

#[test]
fn test_decode_reader_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(ORDER_PAYLOAD.as_bytes()).unwrap();
    file.flush().unwrap();

    let config = HandlerConfig::default().with_buffer_size(1024);
    let handler = DataHandler::new(config).unwrap();
    let reader = file.reopen().unwrap();

    let target = handler.decode_reader::<Order>(reader).unwrap().unwrap();
    assert_eq!(
        handler.mapper().to_source::<Order>(&target).unwrap(),
        sample_order()
    );
}

#[test]
fn test_transform_into_existing_record() {
    let handler = DataHandler::from_binding_context(binding_context([(
        "null.handling.strategy",
        json!("omit"),
    )]))
    .unwrap();
    let mut target = handler.mapper().to_target(&sample_order()).unwrap();

    let copied = handler
        .transform_into::<Order>(br#"{"id": 7, "quantity": 5}"#, &mut target)
        .unwrap();
    assert!(copied >= 2);

    assert_eq!(target.get("id").and_then(TargetValue::as_i64), Some(7));
    assert_eq!(target.get("quantity").and_then(TargetValue::as_i64), Some(5));
    // Fields missing from the payload stay unset in the decoded record
    assert_eq!(target.get("customer").and_then(TargetValue::as_str), Some("Ada"));

    assert_eq!(handler.transform_into::<Order>(b"", &mut target).unwrap(), 0);
}

#[test]
fn test_malformed_and_mistyped_payloads() {
    let handler = DataHandler::new(HandlerConfig::default()).unwrap();

    let err = handler.decode_str::<Order>(r#"{"id": "#).unwrap_err();
    assert_eq!(err.code(), "DESERIALIZATION_ERROR");

    let err = handler.decode_str::<Order>(r#"{"id": "forty-two"}"#).unwrap_err();
    assert_eq!(err.code(), "CONVERSION_ERROR");
}

#[test]
fn test_set_binding_context_rebuilds_mapper() {
    let mut handler = DataHandler::new(HandlerConfig::default()).unwrap();
    handler.decode_str::<Order>(ORDER_PAYLOAD).unwrap();
    assert_eq!(
        handler.cache_stats(),
        CacheStats {
            descriptor_count: 2,
            schema_count: 2
        }
    );

    let context = binding_context([
        ("collection.type.preferences", json!("set")),
        ("tenant", json!("acme")),
    ]);
    handler.set_binding_context(context.clone()).unwrap();
    assert_eq!(handler.binding_context(), &context);
    assert_eq!(handler.cache_stats(), CacheStats::default());
    assert_eq!(
        handler.config().custom_property("tenant"),
        Some(&json!("acme"))
    );

    let err = handler
        .set_binding_context(binding_context([("character.encoding", json!("latin1"))]))
        .unwrap_err();
    assert_eq!(err.code(), "CONFIGURATION_ERROR");
    assert_eq!(handler.binding_context(), &context);
    assert!(handler.validate_configuration().is_ok());
}

#[test]
fn test_clear_caches() {
    let handler = DataHandler::new(HandlerConfig::default()).unwrap();
    handler.decode_str::<Order>(ORDER_PAYLOAD).unwrap();
    assert!(handler.cache_stats().descriptor_count > 0);

    handler.clear_caches();
    assert_eq!(handler.cache_stats(), CacheStats::default());
}

#[test]
fn test_protocols_without_generic_codec() {
    for protocol in ["binary", "compact"] {
        let err =
            DataHandler::from_binding_context(binding_context([("protocol", json!(protocol))]))
                .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_OPERATION");
    }
}
