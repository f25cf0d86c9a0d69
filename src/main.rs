use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tabelog_scout::geocode::GoogleGeocoder;
use tabelog_scout::map::{write_map, MapOutcome};
use tabelog_scout::scrapers::types::parse_base_url;
use tabelog_scout::scrapers::HttpFetcher;
use tabelog_scout::store::SaveOutcome;
use tabelog_scout::{AppConfig, IngestPipeline, PipelineOptions, Store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabelog-scout", version, about = "Scrape Tabelog listings into a restaurant database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a keyword, geocode the results and store them
    Scrape {
        /// Search keyword; prompted for when omitted
        keyword: Option<String>,
        /// Store listings without looking up their coordinates
        #[arg(long)]
        no_geocode: bool,
        /// Only use what the search page shows
        #[arg(long)]
        no_details: bool,
        /// Store listings the geocoder can't place instead of skipping them
        #[arg(long)]
        keep_ungeocoded: bool,
        /// Where to write the marker map
        #[arg(long)]
        map: Option<PathBuf>,
        /// Pause between detail page requests
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Save a restaurant for a user
    Save {
        #[arg(long)]
        user: String,
        #[arg(long)]
        restaurant: i64,
        /// Bookmark id; a UUID is generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// List a user's saved restaurants
    Saved {
        #[arg(long, default_value = "u001")]
        user: String,
    },
    /// Create the database tables
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let store = Store::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    store.init_schema().context("Failed to create schema")?;

    match cli.command {
        Command::Scrape {
            keyword,
            no_geocode,
            no_details,
            keep_ungeocoded,
            map,
            delay_ms,
        } => {
            let keyword = match keyword {
                Some(keyword) => keyword,
                None => prompt_keyword()?,
            };

            let mut options = PipelineOptions::tabelog()?;
            options.base_url = parse_base_url(&config.base_url)?;
            options.request_delay = delay_ms
                .map(Duration::from_millis)
                .unwrap_or(config.request_delay);
            options.fetch_details = !no_details;
            options.require_geocode = !keep_ungeocoded;

            let geocoder = if no_geocode {
                None
            } else {
                let key = config.require_geocoding_key()?;
                Some(GoogleGeocoder::new(key, config.geocode_language.as_str())?)
            };

            let pipeline = IngestPipeline::new(HttpFetcher::new()?, geocoder, store, options);

            info!("🍣 Tabelog Scout");
            info!("================");

            let ctrl_c = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    // no signal handler; let the run finish
                    std::future::pending::<()>().await;
                }
                warn!("Received Ctrl+C, stopping run");
            };
            let summary = pipeline
                .run_until(&keyword, ctrl_c)
                .await
                .context("Search failed")?;

            let map_path = map.unwrap_or_else(|| config.map_output_path.clone());
            let api_key = config.geocoding_api_key.as_deref().unwrap_or_default();
            match write_map(&map_path, &summary.mapped, api_key)? {
                MapOutcome::Written { path, markers } => {
                    println!("🗺️  {} markers written to {}", markers, path.display())
                }
                MapOutcome::NoMarkers => println!("🗺️  No markers to render"),
            }

            println!("✅ {}", summary);
        }
        Command::Save { user, restaurant, id } => {
            match store.save_restaurant(&user, restaurant, id.as_deref())? {
                SaveOutcome::Saved(saved) => println!("✅ Saved restaurant {} for {} ({})", restaurant, user, saved.id),
                SaveOutcome::AlreadySaved => println!("⚠️  Restaurant {} is already saved for {}", restaurant, user),
            }
        }
        Command::Saved { user } => {
            let rows = store.saved_for_user(&user)?;
            println!("🍽️ Saved restaurants for {} ({}):", user, rows.len());
            for row in rows {
                println!(
                    "- {} ({}, {}) | {}: {}",
                    row.name,
                    row.city.as_deref().unwrap_or("-"),
                    row.country.as_deref().unwrap_or("-"),
                    row.category,
                    row.description
                );
            }
        }
        Command::InitDb => {
            info!("💾 Schema ready in {}", config.db_path.display());
        }
    }

    Ok(())
}

fn prompt_keyword() -> Result<String> {
    print!("🔍 Keyword to search: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read keyword")?;
    Ok(line.trim().to_string())
}
