use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mention_scraper::config::{ScrapeParameters, DEFAULT_RECENCY_WINDOW_DAYS, DEFAULT_SCROLL_ITERATIONS};
use mention_scraper::core::{ConfigManager, ScrapeJob};
use mention_scraper::export::{write_export, ExportFormat};
use mention_scraper::start_web_server;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "mention-scraper")]
#[command(about = "Collect recent posts mentioning a company and export them")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web control panel
    Serve,
    /// Run one scrape in the foreground and export the results
    Scrape {
        /// Company name to search for (prompted when omitted)
        #[arg(long)]
        company: Option<String>,
        /// Keep posts from the last N days
        #[arg(long)]
        days: Option<String>,
        /// Number of scroll iterations
        #[arg(long)]
        scrolls: Option<String>,
        /// Directory of captured result pages
        #[arg(long)]
        snapshots: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FormatArg::Xlsx)]
        format: FormatArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Xlsx,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mention_scraper=info,rocket::server=off"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_current_span(false).with_span_list(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

/// Use `value` when given, otherwise ask on stdin.
fn value_or_prompt(value: Option<String>, question: &str, default: Option<u32>) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }

    let mut stdout = std::io::stdout();
    match default {
        Some(default) => write!(stdout, "{} [{}]: ", question, default)?,
        None => write!(stdout, "{}: ", question)?,
    }
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    let line = line.trim().to_string();
    Ok(match default {
        Some(default) if line.is_empty() => default.to_string(),
        _ => line,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = ConfigManager::load()?;

    match cli.command {
        Command::Serve => {
            info!("Server: http://0.0.0.0:{}", config.environment.port);
            start_web_server(config).await
        }
        Command::Scrape {
            company,
            days,
            scrolls,
            snapshots,
            output_dir,
            format,
        } => {
            let company = value_or_prompt(company, "Enter the company name to search for", None)?;
            let days = value_or_prompt(
                days,
                "Enter the number of days to filter",
                Some(DEFAULT_RECENCY_WINDOW_DAYS),
            )?;
            let scrolls = value_or_prompt(
                scrolls,
                "Enter the number of times to scroll",
                Some(DEFAULT_SCROLL_ITERATIONS),
            )?;
            let params = ScrapeParameters::from_text(&company, &days, &scrolls)?;

            let job = ScrapeJob::new(
                params,
                snapshots.unwrap_or_else(|| config.environment.snapshot_path.clone()),
                config.session_config(),
            );
            let records = tokio::task::spawn_blocking(move || {
                job.execute(&mut |percent, message| info!("[{:>3}%] {}", percent, message))
            })
            .await
            .context("Scrape task panicked")??;

            if records.is_empty() {
                info!("No matching posts found, nothing to export");
                return Ok(());
            }

            let dir = output_dir.unwrap_or_else(|| config.environment.export_path.clone());
            let path = write_export(&dir, &records, format.into()).await?;
            println!("Saved {} posts to {}", records.len(), path.display());
            Ok(())
        }
    }
}
