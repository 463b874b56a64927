mod common;

use bson::doc;
use pagelite::utils::devlog;

// current_thread runtime: both branches run on this thread, so the sink sees them.
#[tokio::test]
async fn find_emits_count_and_find_bench_lines() {
    let _g = devlog::enable_thread_sink();
    let col = common::products(25);
    pagelite::new(&col).filter(doc! {}).page(1).limit(10).find().await.unwrap();

    let mut lines: Vec<serde_json::Value> =
        devlog::drain().iter().map(|l| serde_json::from_str(l).unwrap()).collect();
    lines.sort_by_key(|v| v["op"].as_str().unwrap_or_default().to_string());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["op"], "count");
    assert_eq!(lines[0]["result_count"], 25);
    assert_eq!(lines[1]["op"], "find");
    assert_eq!(lines[1]["result_count"], 10);
    assert!(lines.iter().all(|v| v["bench"] == "page" && v["source"] == "products"));
}

#[tokio::test]
async fn aggregate_emits_both_pipeline_lines() {
    let _g = devlog::enable_thread_sink();
    let col = common::products(7);
    pagelite::new(&col).page(2).limit(5).aggregate().await.unwrap();
    let ops: Vec<String> = devlog::drain()
        .iter()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["op"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ops.len(), 2);
    assert!(ops.contains(&"aggregate".to_string()));
    assert!(ops.contains(&"aggregate_count".to_string()));
}

#[tokio::test]
async fn validation_failures_emit_nothing() {
    let _g = devlog::enable_thread_sink();
    let col = common::products(3);
    assert!(pagelite::new(&col).page(1).limit(5).find().await.is_err());
    assert!(devlog::drain().is_empty());
}
