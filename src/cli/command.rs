use std::path::PathBuf;

pub enum Command {
    /// Page through the documents in `file` that match `filter_json`.
    Find {
        file: PathBuf,
        filter_json: String,
        project: Option<String>,
        sort: Option<String>,
        page: i64,
        limit: i64,
    },
    /// Page through the output of an aggregation pipeline over `file`.
    Aggregate {
        file: PathBuf,
        pipeline_json: String,
        sort: Option<String>,
        page: i64,
        limit: i64,
    },
    /// Print the effective configuration.
    ConfigShow,
}
