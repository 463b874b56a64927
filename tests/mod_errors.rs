use std::error::Error;

use pagelite::PageError;

#[test]
fn display_strings() {
    assert_eq!(PageError::Validation("missing filter".into()).to_string(), "Validation error: missing filter");
    assert_eq!(PageError::Timeout { elapsed_ms: 42 }.to_string(), "deadline exceeded after 42 ms");
    assert_eq!(PageError::Config("bad".into()).to_string(), "Config error: bad");
    assert_eq!(PageError::Io("gone".into()).to_string(), "I/O error: gone");
}

#[test]
fn query_errors_keep_their_source() {
    let err = PageError::Query("socket closed".into());
    assert_eq!(err.to_string(), "Query error: socket closed");
    assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("socket closed"));
    assert!(!err.is_validation());
}

#[test]
fn json_and_decode_conversions() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: PageError = json_err.into();
    assert!(err.to_string().starts_with("Serde JSON:"));

    let decode_err = bson::deserialize_from_document::<i32>(bson::doc! {"a": 1}).unwrap_err();
    let err: PageError = decode_err.into();
    assert!(matches!(err, PageError::Decode(_)));
}
