//! Vellum CMS Kernel
//!
//! Command-line access to the filter compiler and template renderer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vellum_kernel::cache::CacheService;
use vellum_kernel::query::{fetch_rows, parse_from_query_with_limit};
use vellum_kernel::{Config, QueryFilterBuilder, TemplateRenderer, db, metrics};

/// Vellum kernel tools.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a filter from query-string parameters and print the result.
    Query {
        /// Table or view to select from.
        #[arg(long)]
        table: String,

        /// Query-string parameter as `key=value` (repeatable).
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Run the compiled query against DATABASE_URL and print the rows.
        #[arg(long)]
        execute: bool,
    },

    /// Render a template file against JSON data.
    Render {
        /// Template file.
        #[arg(long)]
        template: PathBuf,

        /// JSON data file (default: empty object).
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    metrics::tracker().record_request();

    let output = match cli.command {
        Command::Query {
            table,
            params,
            execute,
        } => run_query(&config, &table, params, execute).await?,
        Command::Render { template, data } => run_render(&template, data.as_deref())?,
    };
    println!("{output}");

    let tracker = metrics::tracker();
    debug!(
        rps = tracker.requests_per_second(),
        total = tracker.total_requests(),
        average_rps = tracker.average_rps(),
        "request metrics"
    );

    Ok(())
}

async fn run_query(
    config: &Config,
    table: &str,
    params: Vec<(String, String)>,
    execute: bool,
) -> Result<String> {
    let query: HashMap<String, String> = params.into_iter().collect();
    let filter = parse_from_query_with_limit(&query, config.query_max_limit);
    let result = QueryFilterBuilder::new().build(table, &filter);

    if !execute {
        return serde_json::to_string_pretty(&result).context("failed to serialize query");
    }

    let result = result.ensure_valid()?;
    let pool = db::create_pool(config).await?;
    db::check_health(&pool).await?;
    info!(url = %config.database_url, "Database connection established");

    let cache = CacheService::new(config.cache_config());
    let key = cache.generate_key(
        "query",
        Some(&serde_json::to_string(&result).context("failed to serialize query")?),
    );
    let rows = cache
        .get_or_set(
            &key,
            || async {
                let rows = fetch_rows(&pool, &result).await?;
                serde_json::to_value(rows).context("failed to serialize rows")
            },
            None,
        )
        .await?;

    serde_json::to_string_pretty(&rows).context("failed to serialize rows")
}

fn run_render(template: &Path, data: Option<&Path>) -> Result<String> {
    let source = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read template {}", template.display()))?;

    let data = match data {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read data {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON in {}", path.display()))?
        }
        None => Value::Object(serde_json::Map::new()),
    };

    Ok(TemplateRenderer::new().render(&source, &data))
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vellum_kernel=info,vellum=info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
