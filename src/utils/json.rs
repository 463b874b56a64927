use crate::errors::PageError;

/// Convert a serde_json::Value that must be an object into a bson::Document.
pub fn json_value_to_bson_document(val: &serde_json::Value) -> Result<bson::Document, PageError> {
    let obj = val
        .as_object()
        .ok_or_else(|| PageError::Config("expected JSON object".into()))?;
    bson::Document::try_from(obj.clone()).map_err(|e| PageError::Config(e.to_string()))
}

/// Parse a JSON string into a bson::Document. The JSON must be a top-level object.
pub fn parse_json_to_bson_document(json: &str) -> Result<bson::Document, PageError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    json_value_to_bson_document(&val)
}

/// Parse a JSON array of stage objects into pipeline documents.
pub fn parse_json_pipeline(json: &str) -> Result<Vec<bson::Document>, PageError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    let stages = val
        .as_array()
        .ok_or_else(|| PageError::Config("pipeline must be a JSON array".into()))?;
    stages.iter().map(json_value_to_bson_document).collect()
}

/// Relaxed extended JSON for printing documents.
#[must_use]
pub fn bson_document_to_json(doc: &bson::Document) -> serde_json::Value {
    bson::Bson::Document(doc.clone()).into_relaxed_extjson()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_bson_success() {
        let d = parse_json_to_bson_document("{\"a\":1,\"b\":\"x\"}").unwrap();
        assert_eq!(d.get_i32("a").unwrap(), 1);
        assert_eq!(d.get_str("b").unwrap(), "x");
    }

    #[test]
    fn json_to_bson_rejects_array() {
        let e = parse_json_to_bson_document("[1,2,3]").unwrap_err();
        assert!(matches!(e, PageError::Config(_)));
    }

    #[test]
    fn pipeline_requires_array_of_objects() {
        let stages = parse_json_pipeline(r#"[{"$match":{"a":1}},{"$limit":2}]"#).unwrap();
        assert_eq!(stages.len(), 2);
        assert!(stages[0].contains_key("$match"));
        assert!(parse_json_pipeline(r#"{"$match":{}}"#).is_err());
        assert!(parse_json_pipeline(r#"[1]"#).is_err());
    }
}
