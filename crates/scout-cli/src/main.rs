mod batch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use scout_client::{GeminiSource, PageCrawler};
use scout_core::config::EnrichmentConfig;
use scout_core::driver::DriverSlot;
use scout_core::{BreakerSnapshot, BreakerStore, EnrichmentOutcome, EnrichmentService};

use crate::batch::{ResultRow, ResultWriter};

#[cfg(feature = "browser")]
type AppDriver = scout_client::ChromiumDriver;
#[cfg(not(feature = "browser"))]
type AppDriver = no_browser::NoDriver;

type AppService = EnrichmentService<Option<GeminiSource>, PageCrawler, AppDriver>;

#[derive(Parser)]
#[command(name = "scout", version, about = "Company enrichment with AI and crawling fallback")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a single company
    Enrich {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// LinkedIn company page, used as crawl target
        #[arg(short, long, default_value = "")]
        linkedin: String,

        /// Print the profile and the breaker state as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Enrich every company in a CSV file (`name,linkedin_url`)
    Batch {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run browser driver acquisition once and report the result
    CheckDriver,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EnrichmentConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Enrich {
            company,
            linkedin,
            json,
        } => {
            let service = build_service(&config).await?;
            let result = cmd_enrich(&service, &company, &linkedin, json).await;
            service.driver_slot().shutdown().await;
            result?;
        }
        Commands::Batch { input, output } => {
            let service = build_service(&config).await?;
            let result = cmd_batch(&service, &input, output.as_deref()).await;
            service.driver_slot().shutdown().await;
            result?;
        }
        Commands::CheckDriver => {
            cmd_check_driver(&config).await;
        }
    }

    Ok(())
}

async fn build_service(config: &EnrichmentConfig) -> Result<AppService> {
    let ai = build_ai_source(config)?;
    let breakers = BreakerStore::new(config.breaker.clone());
    let slot = Arc::new(acquire_driver(config).await);

    Ok(EnrichmentService::new(ai, PageCrawler::new(), breakers, slot))
}

/// The API key is only required while AI generation is enabled by
/// configuration; with a zero failure threshold Scout runs crawl-only.
fn build_ai_source(config: &EnrichmentConfig) -> Result<Option<GeminiSource>> {
    if config.breaker.ai_failure_threshold == 0 && config.ai.api_key.is_none() {
        tracing::info!("AI generation disabled and no API key set; running crawl-only");
        return Ok(None);
    }
    let source = GeminiSource::from_config(&config.ai).context("Failed to create AI client")?;
    Ok(Some(source))
}

#[cfg(feature = "browser")]
async fn acquire_driver(config: &EnrichmentConfig) -> DriverSlot<AppDriver> {
    let launcher = scout_client::ChromiumLauncher::new();
    let chain = scout_core::DriverChain::new(launcher, config.driver.clone());
    let slot = DriverSlot::new();
    slot.initialize(&chain).await;
    slot
}

#[cfg(not(feature = "browser"))]
async fn acquire_driver(_config: &EnrichmentConfig) -> DriverSlot<AppDriver> {
    tracing::warn!("Built without browser support; crawling is unavailable");
    DriverSlot::with_driver(None)
}

async fn cmd_enrich(service: &AppService, company: &str, linkedin: &str, json: bool) -> Result<()> {
    let outcome = service.generate_company_info(company, linkedin).await;

    if json {
        let report = json_report(&outcome, &service.status_reporter().snapshot());
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match outcome {
        EnrichmentOutcome::Success(info) => {
            println!("{}", info.name);
            for (label, value) in [
                ("Description", &info.description),
                ("Website", &info.website),
                ("Industry", &info.industry),
                ("Size", &info.company_size),
                ("Headquarters", &info.headquarters),
                ("Specialties", &info.specialties),
                ("LinkedIn", &info.linkedin_url),
            ] {
                if !value.is_empty() {
                    println!("  {label}: {value}");
                }
            }
        }
        EnrichmentOutcome::Empty => {
            println!("No information available for '{company}'");
        }
    }

    println!("{}", service.ai_service_status());
    Ok(())
}

async fn cmd_batch(
    service: &AppService,
    input: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let rows = batch::read_rows(input)?;
    let mut writer = ResultWriter::create(output)?;

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, stopping after the current company");
            signal_token.cancel();
        }
    });

    tracing::info!(companies = rows.len(), "Starting batch enrichment");

    let mut found = 0;
    let mut processed = 0;
    for row in &rows {
        if cancel_token.is_cancelled() {
            break;
        }

        let outcome = service
            .generate_company_info(&row.name, &row.linkedin_url)
            .await;
        if outcome.is_success() {
            found += 1;
        }
        processed += 1;
        writer.write(&ResultRow::new(row, &outcome))?;
    }

    tracing::info!(processed, found, total = rows.len(), "Batch enrichment finished");
    eprintln!("{}", service.ai_service_status());
    Ok(())
}

async fn cmd_check_driver(config: &EnrichmentConfig) {
    let slot = acquire_driver(config).await;

    match slot.get() {
        Some(driver) => {
            let driver = driver.lock().await;
            println!("Driver ready: {}", describe(&driver));
        }
        None => println!("No browser driver available; crawling would be disabled"),
    }

    slot.shutdown().await;
}

/// `{"company": <profile or null>, "status": <breaker snapshot>}`
fn json_report(outcome: &EnrichmentOutcome, snapshot: &BreakerSnapshot) -> serde_json::Value {
    let company = match outcome {
        EnrichmentOutcome::Success(info) => serde_json::to_value(info).unwrap_or_default(),
        EnrichmentOutcome::Empty => serde_json::Value::Null,
    };
    serde_json::json!({
        "company": company,
        "status": snapshot,
    })
}

#[cfg(feature = "browser")]
fn describe(driver: &AppDriver) -> String {
    driver.engine().to_string()
}

#[cfg(not(feature = "browser"))]
fn describe(driver: &AppDriver) -> String {
    match *driver {}
}

#[cfg(not(feature = "browser"))]
mod no_browser {
    use scout_core::driver::DriverTimeouts;
    use scout_core::error::AppError;
    use scout_core::traits::Driver;

    /// Stand-in driver type for builds without browser support. It has no
    /// values, so the driver slot is always empty.
    pub enum NoDriver {}

    impl Driver for NoDriver {
        fn apply_timeouts(&mut self, _timeouts: &DriverTimeouts) -> Result<(), AppError> {
            match *self {}
        }

        async fn load(&mut self, _url: &str) -> Result<String, AppError> {
            match *self {}
        }

        async fn close(&mut self) -> Result<(), AppError> {
            match *self {}
        }
    }
}
