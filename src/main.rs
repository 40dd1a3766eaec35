use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use job_harvester::crawling::supervision::ConsoleSupervisor;
use job_harvester::crawling::{CrawlError, CrawlRun};
use job_harvester::domain::query::SearchQuery;
use job_harvester::infrastructure::config::AppConfig;
use job_harvester::infrastructure::logging;
use job_harvester::infrastructure::parsing::ListingParser;
use job_harvester::infrastructure::repository::JobRepository;
use job_harvester::infrastructure::sink::OutputFormat;
use job_harvester::infrastructure::webdriver_session::WebDriverSession;

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_DATABASE_URL: &str = "sqlite://jobs.db?mode=rwc";

#[derive(Parser)]
#[command(name = "job-harvester", version, about = "Supervised crawler for paginated job listings")]
struct Cli {
    /// Configuration file (JSON). Defaults are used when absent.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to this directory.
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl job listings for one or more search URLs.
    Scrape {
        /// Search URL; repeatable.
        #[arg(long = "query", value_name = "URL")]
        queries: Vec<String>,

        /// File with one search URL per line.
        #[arg(long, value_name = "FILE")]
        queries_file: Option<PathBuf>,

        /// Listing pages to visit per query, at most.
        #[arg(long, default_value_t = 50)]
        pages: u32,

        #[arg(long, value_enum, default_value = "jsonl")]
        format: OutputFormat,

        /// Directory for run output files.
        #[arg(long, default_value = "./data", value_name = "DIR")]
        out_dir: PathBuf,

        /// WebDriver endpoint; falls back to $WEBDRIVER_URL.
        #[arg(long, value_name = "URL")]
        webdriver_url: Option<String>,

        /// Run the browser headless.
        #[arg(long)]
        headless: bool,
    },

    /// Load a finished run file into a SQLite database.
    Ingest {
        /// Run output file (.jsonl or .csv).
        input: PathBuf,

        /// Input format; inferred from the file extension when omitted.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Database URL; falls back to $DATABASE_URL.
        #[arg(long, value_name = "URL")]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_dir.as_deref())?;

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("job-harvester.json"));
    let config = AppConfig::load(&config_path).await?;

    match cli.command {
        Command::Scrape {
            queries,
            queries_file,
            pages,
            format,
            out_dir,
            webdriver_url,
            headless,
        } => {
            scrape(
                &config,
                queries,
                queries_file,
                pages,
                format,
                &out_dir,
                webdriver_url,
                headless,
            )
            .await
        }
        Command::Ingest {
            input,
            format,
            database_url,
        } => ingest(&input, format, database_url).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn scrape(
    config: &AppConfig,
    queries: Vec<String>,
    queries_file: Option<PathBuf>,
    pages: u32,
    format: OutputFormat,
    out_dir: &Path,
    webdriver_url: Option<String>,
    headless: bool,
) -> Result<()> {
    // Everything that can be wrong with the run parameters is reported here,
    // before any browsing session is opened.
    let raw_queries = collect_queries(queries, queries_file)?;
    if raw_queries.is_empty() {
        bail!("No search URLs given; pass --query or --queries-file");
    }

    let mut parsed = Vec::with_capacity(raw_queries.len());
    for raw in &raw_queries {
        let query = SearchQuery::parse(raw)?;
        query.validate()?;
        parsed.push(query);
    }

    let parser = ListingParser::new(&config.site)?;
    let endpoint = webdriver_url
        .or_else(|| std::env::var("WEBDRIVER_URL").ok())
        .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_owned());

    let session = WebDriverSession::connect(&endpoint, headless).await?;
    let outcome = run_queries(&session, &parser, config, &parsed, pages, out_dir, format).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close browsing session cleanly: {}", e);
    }
    outcome
}

async fn run_queries(
    session: &WebDriverSession,
    parser: &ListingParser,
    config: &AppConfig,
    queries: &[SearchQuery],
    pages: u32,
    out_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let supervisor = ConsoleSupervisor;
    let run = CrawlRun::new(session, parser, config, &supervisor);

    for (i, query) in queries.iter().enumerate() {
        info!("Query {}/{}: {}", i + 1, queries.len(), query.as_url());

        match run.execute(query, pages, out_dir, format).await {
            Ok(summary) => {
                info!(
                    "Saved {} records to {} ({} pages visited, {} skipped)",
                    summary.records,
                    summary.output.display(),
                    summary.pages_visited,
                    summary.pages_skipped
                );
            }
            Err(CrawlError::PageStructure { selector }) => {
                // The listing never took shape for this query; move on to the
                // next one rather than aborting the whole run.
                warn!(
                    "Query {} skipped: listing structure '{}' never appeared",
                    query.as_url(),
                    selector
                );
            }
            Err(e) => {
                error!("Run terminated: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn collect_queries(
    mut queries: Vec<String>,
    queries_file: Option<PathBuf>,
) -> Result<Vec<String>> {
    if let Some(path) = queries_file {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read queries file {}", path.display()))?;
        queries.extend(
            raw.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned),
        );
    }
    Ok(queries)
}

async fn ingest(
    input: &Path,
    format: Option<OutputFormat>,
    database_url: Option<String>,
) -> Result<()> {
    let format = format
        .or_else(|| OutputFormat::from_path(input))
        .with_context(|| {
            format!(
                "Cannot infer format of {}; pass --format",
                input.display()
            )
        })?;

    let database_url = database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());

    let repository = JobRepository::connect(&database_url).await?;
    let loaded = repository.ingest_file(input, format).await?;
    let total = repository.count().await?;

    info!("Ingested {} records; database now holds {}", loaded, total);
    Ok(())
}
