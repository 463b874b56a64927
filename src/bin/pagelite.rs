use clap::{Parser, Subcommand};
use pagelite::{PagingConfig, cli as prog_cli};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagelite", version, about = "Paginate BSON documents from NDJSON or JSON files", long_about=None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, PAGELITE_CONFIG or ./pagelite.toml are tried.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Output format: json|plain|human (default json)")]
    format: Option<String>,
    #[arg(long, help = "Log level override: off|error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Page through documents matching a filter")]
    Find {
        #[arg(help = "NDJSON file or JSON array of documents")]
        file: PathBuf,
        #[arg(long, default_value = "{}", help = "Filter as a JSON object")]
        filter: String,
        #[arg(long, help = "Projection as a JSON object, e.g. {\"name\":1}")]
        select: Option<String>,
        #[arg(long, help = "Comma-separated sort keys; prefix with - for descending, e.g. -price,name")]
        sort: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 0, help = "Page size; 0 uses the configured default")]
        limit: i64,
    },
    #[command(about = "Page through the output of an aggregation pipeline")]
    Aggregate {
        #[arg(help = "NDJSON file or JSON array of documents")]
        file: PathBuf,
        #[arg(long, default_value = "[]", help = "Pipeline stages as a JSON array")]
        pipeline: String,
        #[arg(long, help = "Comma-separated sort keys; prefix with - for descending")]
        sort: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 0, help = "Page size; 0 uses the configured default")]
        limit: i64,
    },
    #[command(name = "config-show", about = "Print the effective configuration")]
    ConfigShow,
}

fn init_logging(cfg: &PagingConfig, level: Option<&str>) {
    let level = level.or(cfg.log_level.as_deref());
    let res = if let Some(path) = &cfg.log_config {
        pagelite::utils::logger::init_path(path)
    } else if cfg.log_dir.is_some() || level.is_some() {
        pagelite::utils::logger::configure_logging(cfg.log_dir.as_deref(), level, None, false)
    } else if std::env::var_os("PAGELITE_LOG_DIR").is_some() || std::env::var_os("PAGELITE_LOG_LEVEL").is_some() {
        pagelite::utils::logger::configure_from_env()
    } else {
        Ok(())
    };
    if let Err(e) = res {
        eprintln!("warning: logging disabled: {e}");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match PagingConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&cfg, cli.log_level.as_deref());
    let mode = prog_cli::parse_output_mode(cli.format.as_deref());

    let cmd = match cli.command {
        Commands::Find { file, filter, select, sort, page, limit } => prog_cli::Command::Find {
            file,
            filter_json: filter,
            project: select,
            sort,
            page,
            limit,
        },
        Commands::Aggregate { file, pipeline, sort, page, limit } => {
            prog_cli::Command::Aggregate { file, pipeline_json: pipeline, sort, page, limit }
        }
        Commands::ConfigShow => prog_cli::Command::ConfigShow,
    };

    let mut stdout = std::io::stdout();
    if let Err(e) = prog_cli::run_with_format(&cfg, cmd, mode, &mut stdout).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
