use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use fadascraper::config::Config;
use fadascraper::consolidate::{self, PeriodSelection};
use fadascraper::pipeline::{self, ProgressSnapshot};
use fadascraper::{period, scrape, server};
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "fadascraper", about = "Vehicle retail press-release ETL")]
struct Cli {
    /// Path to a JSON config file (defaults to fadascraper.json if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape, download, extract and build the master report (default).
    Run {
        /// Months to include, 1-12 (comma separated). Empty means all.
        #[arg(long, value_delimiter = ',')]
        months: Vec<u32>,
        /// Years to include (comma separated). Empty means all.
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
    },
    /// Rebuild the master report from already-extracted workbooks.
    Consolidate {
        #[arg(long, value_delimiter = ',')]
        months: Vec<u32>,
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
    },
    /// List the months available on the press-release listing.
    Months,
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // ─── 3) dispatch ─────────────────────────────────────────────────
    match cli.command.unwrap_or(Command::Run {
        months: Vec::new(),
        years: Vec::new(),
    }) {
        Command::Run { months, years } => run(config, PeriodSelection { months, years }),
        Command::Consolidate { months, years } => {
            rebuild(config, PeriodSelection { months, years })
        }
        Command::Months => list_months(config),
        Command::Serve { bind, port } => server::serve(config, &bind, port),
    }
}

fn run(config: Config, selection: PeriodSelection) -> Result<()> {
    let progress = Arc::new(Mutex::new(ProgressSnapshot::default()));
    let runtime = Runtime::new()?;
    let master = runtime.block_on(pipeline::run_pipeline(&config, &selection, progress))?;

    match master {
        Some(master) => info!(artifact = %master.artifact.display(), "master report written"),
        None => info!("no data available; nothing written"),
    }
    Ok(())
}

fn rebuild(config: Config, selection: PeriodSelection) -> Result<()> {
    config.ensure_dirs()?;
    let master =
        consolidate::build_master(&config.excel_dir(), &config.output_dir(), Some(&selection))?;
    match master {
        Some(master) => info!(artifact = %master.artifact.display(), "master report written"),
        None => info!("no data available; nothing written"),
    }
    Ok(())
}

fn list_months(config: Config) -> Result<()> {
    let runtime = Runtime::new()?;
    let links = runtime.block_on(async {
        let client = pipeline::http_client(&config)?;
        scrape::fetch_pdf_links(&client, &config).await
    })?;

    for (year, month) in scrape::available_months(&links) {
        println!("{}", period::format_month_year(month, year));
    }
    Ok(())
}
