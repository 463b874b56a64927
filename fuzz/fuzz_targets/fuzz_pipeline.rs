#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(stages) = pagelite::utils::json::parse_json_pipeline(s) {
            let docs = (0..8).map(|i| bson::doc!{"i": i, "name": format!("n{i}"), "odd": i % 2 == 1}).collect();
            let _ = pagelite::memory::run_pipeline(docs, &stages, data.len() % 2 == 0);
        }
    }
});
