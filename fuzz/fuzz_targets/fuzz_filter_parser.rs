#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        // Parsing and evaluating arbitrary filters must not panic
        if let Ok(doc) = pagelite::utils::json::parse_json_to_bson_document(s) {
            if let Ok(filter) = pagelite::memory::parse_filter(&doc) {
                let docs = [
                    bson::doc!{"a": 1, "b": 2, "name": "x"},
                    bson::doc!{"a": 10, "b": -5, "name": "y", "nested": {"z": 3}},
                    bson::doc!{"tags": ["p", "q"], "active": true},
                ];
                for d in &docs {
                    let _ = pagelite::memory::eval_filter(d, &filter);
                }
            }
        }
    }
});
