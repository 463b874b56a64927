use std::io::Write;
use std::path::Path;

use crate::config::PagingConfig;
use crate::memory::MemoryCollection;
use crate::query::PagedData;
use crate::utils::json::{bson_document_to_json, parse_json_pipeline, parse_json_to_bson_document};

use super::command::Command;
use super::util::{load_documents, parse_sort};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

fn open_collection(file: &Path) -> Result<MemoryCollection, Box<dyn std::error::Error>> {
    let name = file.file_stem().map_or_else(|| "stdin".to_string(), |s| s.to_string_lossy().into_owned());
    let docs = load_documents(file)?;
    log::info!("loaded {} document(s) from {}", docs.len(), file.display());
    Ok(MemoryCollection::with_documents(name, docs))
}

fn write_page(out: &mut dyn Write, page: &PagedData, mode: OutputMode) -> Result<(), Box<dyn std::error::Error>> {
    let data: Vec<serde_json::Value> = page.data.iter().map(bson_document_to_json).collect();
    match mode {
        OutputMode::Json => {
            let v = serde_json::json!({ "data": data, "pagination": page.pagination });
            writeln!(out, "{v}")?;
        }
        OutputMode::Human => {
            let v = serde_json::json!({ "data": data, "pagination": page.pagination });
            writeln!(out, "{}", serde_json::to_string_pretty(&v)?)?;
        }
        OutputMode::Plain => {
            for d in &data {
                writeln!(out, "{d}")?;
            }
            let p = &page.pagination;
            writeln!(
                out,
                "total={} page={} per_page={} prev={} next={} total_page={}",
                p.total, p.page, p.per_page, p.prev, p.next, p.total_page
            )?;
        }
    }
    Ok(())
}

/// Runs `cmd` and writes its result to `out`.
///
/// # Errors
/// Any load, parse or paging failure. Nothing is written on error.
pub async fn run_with_format(
    cfg: &PagingConfig,
    cmd: Command,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Find { file, filter_json, project, sort, page, limit } => {
            let col = open_collection(&file)?;
            let filter = parse_json_to_bson_document(&filter_json)?;
            let mut q = crate::new(&col).config(cfg).filter(filter).page(page).limit(limit);
            for (field, order) in sort.as_deref().map(parse_sort).unwrap_or_default() {
                q = q.sort(field, order);
            }
            if let Some(p) = project {
                q = q.select(parse_json_to_bson_document(&p)?);
            }
            let result = q.find().await?;
            write_page(out, &result, mode)
        }
        Command::Aggregate { file, pipeline_json, sort, page, limit } => {
            let col = open_collection(&file)?;
            let stages = parse_json_pipeline(&pipeline_json)?;
            let mut q = crate::new(&col).config(cfg).stages(stages).page(page).limit(limit);
            for (field, order) in sort.as_deref().map(parse_sort).unwrap_or_default() {
                q = q.sort(field, order);
            }
            let result = q.aggregate().await?;
            write_page(out, &result, mode)
        }
        Command::ConfigShow => {
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::to_string(cfg)?)?,
                OutputMode::Human | OutputMode::Plain => writeln!(out, "{}", toml::to_string_pretty(cfg)?)?,
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".ndjson").tempfile().unwrap();
        for i in 0..25 {
            writeln!(f, "{{\"_id\":{i},\"name\":\"p{i}\",\"price\":{}}}", i * 10).unwrap();
        }
        f
    }

    async fn run_json(cmd: Command) -> serde_json::Value {
        let mut buf = Vec::new();
        run_with_format(&PagingConfig::default(), cmd, OutputMode::Json, &mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[tokio::test]
    async fn find_prints_last_page() {
        let f = products_file();
        let v = run_json(Command::Find {
            file: f.path().to_path_buf(),
            filter_json: "{}".into(),
            project: Some(r#"{"name":1,"_id":0}"#.into()),
            sort: Some("-price".into()),
            page: 3,
            limit: 10,
        })
        .await;
        assert_eq!(v["data"].as_array().unwrap().len(), 5);
        assert_eq!(v["data"][0], serde_json::json!({"name": "p4"}));
        assert_eq!(v["pagination"]["totalPage"], 3);
        assert_eq!(v["pagination"]["prev"], 2);
        assert_eq!(v["pagination"]["next"], 0);
    }

    #[tokio::test]
    async fn aggregate_prints_matched_page() {
        let f = products_file();
        let v = run_json(Command::Aggregate {
            file: f.path().to_path_buf(),
            pipeline_json: r#"[{"$match":{"price":{"$gte":100}}}]"#.into(),
            sort: Some("price".into()),
            page: 1,
            limit: 4,
        })
        .await;
        assert_eq!(v["pagination"]["total"], 15);
        assert_eq!(v["pagination"]["next"], 2);
        assert_eq!(v["data"][0]["price"], 100);
    }

    #[tokio::test]
    async fn plain_mode_ends_with_summary_line() {
        let f = products_file();
        let mut buf = Vec::new();
        let cmd = Command::Find {
            file: f.path().to_path_buf(),
            filter_json: r#"{"price":{"$lt":30}}"#.into(),
            project: None,
            sort: None,
            page: 1,
            limit: 10,
        };
        run_with_format(&PagingConfig::default(), cmd, OutputMode::Plain, &mut buf).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "total=3 page=1 per_page=10 prev=0 next=0 total_page=1");
    }

    #[tokio::test]
    async fn bad_pipeline_writes_nothing() {
        let f = products_file();
        let mut buf = Vec::new();
        let cmd = Command::Aggregate {
            file: f.path().to_path_buf(),
            pipeline_json: "{}".into(),
            sort: None,
            page: 1,
            limit: 10,
        };
        assert!(run_with_format(&PagingConfig::default(), cmd, OutputMode::Json, &mut buf).await.is_err());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn config_show_round_trips() {
        let cfg = PagingConfig { default_limit: 25, timeout_ms: Some(500), ..PagingConfig::default() };
        let mut buf = Vec::new();
        run_with_format(&cfg, Command::ConfigShow, OutputMode::Plain, &mut buf).await.unwrap();
        let back = PagingConfig::from_toml_str(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}
