#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the inventory sync.
//!
//! `chunk` runs a single chunk, exactly like one call to the server's
//! `POST /api/sync/chunk`. `run` drives consecutive chunks with a
//! [`ChunkCursor`] until the catalog is covered, pausing between chunks if
//! asked to.
//!
//! Uses `indicatif-log-bridge` (via [`inventory_sync_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use inventory_sync_cli_utils::IndicatifProgress;
use inventory_sync_config::{ConnectionSettings, SyncConfig};
use inventory_sync_erp::{ErpClient, ErpSource};
use inventory_sync_reconcile::{ChunkCursor, ChunkRequest, SyncContext, run_chunk};
use inventory_sync_server_models::ApiChunkResponse;
use inventory_sync_storefront::{GraphqlStorefront, Storefront};

#[derive(Parser)]
#[command(name = "inventory_sync", about = "ERP to storefront inventory sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one chunk of the catalog
    Chunk {
        /// Index of the first product
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        offset: i64,
        /// Products in the chunk (defaults to the configured chunk size)
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        /// Print the API response JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Reconcile the whole catalog chunk by chunk
    Run {
        /// Offset to resume from
        #[arg(long, default_value = "0")]
        offset: u64,
        /// Products per chunk (defaults to the configured chunk size)
        #[arg(long)]
        limit: Option<u64>,
        /// Pause between chunks in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,
    },
    /// Print the effective engine configuration
    Config,
}

/// Clients shared by every chunk of one CLI invocation.
struct Clients {
    erp: Arc<dyn ErpSource>,
    storefront: Arc<dyn Storefront>,
    erp_location_id: String,
}

impl Clients {
    fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let settings = ConnectionSettings::from_env()?;
        let client = reqwest::Client::new();

        Ok(Self {
            erp: Arc::new(ErpClient::from_settings(client.clone(), &settings.erp)),
            storefront: Arc::new(GraphqlStorefront::from_settings(
                client,
                &settings.storefront,
            )),
            erp_location_id: settings.erp.location_id,
        })
    }

    /// Fresh per-invocation context.
    fn context(&self, config: &SyncConfig) -> SyncContext {
        SyncContext::new(
            self.erp.clone(),
            self.storefront.clone(),
            config.clone(),
            self.erp_location_id.clone(),
        )
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = inventory_sync_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = SyncConfig::load()?;

    match cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Chunk {
            offset,
            limit,
            json,
        } => {
            let limit = limit
                .unwrap_or_else(|| i64::try_from(config.default_limit).unwrap_or(i64::MAX));
            let clients = Clients::from_env()?;
            let ctx = clients.context(&config);

            let response = match run_chunk(&ctx, ChunkRequest::new(offset, limit), None).await {
                Ok(outcome) => ApiChunkResponse::from_outcome(outcome, config.results_preview),
                Err(e) => {
                    log::error!("Chunk failed: {e}");
                    ApiChunkResponse::failure(e.to_string())
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_summary(&response);
            }

            if !response.success {
                std::process::exit(1);
            }
        }
        Commands::Run {
            offset,
            limit,
            delay_ms,
        } => {
            let limit = limit.unwrap_or(config.default_limit);
            let clients = Clients::from_env()?;
            let progress = IndicatifProgress::products_bar(&multi, "Loading catalog...");

            let mut cursor = ChunkCursor::resume(offset, limit);
            let mut totals = inventory_sync_server_models::ApiChunkCounters::default();
            let mut first = true;

            while let Some(request) = cursor.next_request() {
                if !first && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }

                let ctx = clients.context(&config);
                let outcome = match run_chunk(&ctx, request, Some(&progress)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        progress.finish(format!("Stopped at offset {}", cursor.offset()));
                        log::error!(
                            "Chunk at offset {} failed: {e}. Resume with --offset {}",
                            cursor.offset(),
                            cursor.offset()
                        );
                        return Err(e.into());
                    }
                };

                if first {
                    progress.set_total(outcome.progress.total_records.saturating_sub(offset));
                    progress.set_position(outcome.progress.processed_records);
                    first = false;
                }

                totals.updated += outcome.counters.updated;
                totals.no_change += outcome.counters.no_change;
                totals.errors += outcome.counters.errors;
                totals.not_found += outcome.counters.not_found;
                totals.processed += outcome.counters.processed;

                cursor.advance(&outcome.progress);
            }

            progress.finish(format!("Synced {} products", totals.processed));
            println!(
                "updated={} no_change={} not_found={} errors={} processed={}",
                totals.updated, totals.no_change, totals.not_found, totals.errors, totals.processed
            );
        }
    }

    Ok(())
}

fn print_summary(response: &ApiChunkResponse) {
    if let Some(error) = &response.error {
        println!("FAILED: {error}");
        return;
    }

    let counts = &response.chunk_results;
    println!(
        "Chunk {}/{}: {} of {} products",
        response.current_chunk + 1,
        response.total_chunks.max(1),
        response.processed_records,
        response.total_records
    );
    println!(
        "updated={} no_change={} not_found={} errors={}",
        counts.updated, counts.no_change, counts.not_found, counts.errors
    );
    match response.next_offset {
        Some(next) => println!("Next offset: {next}"),
        None => println!("Complete"),
    }

    if !response.results.is_empty() {
        println!();
        println!(
            "{:<24} {:<10} {:>8} {:>10} {:>10}",
            "SKU", "STATUS", "QTY", "PRICE A", "PRICE B"
        );
        println!("{}", "-".repeat(66));
        for result in &response.results {
            println!(
                "{:<24} {:<10} {:>8} {:>10} {:>10}",
                result.sku,
                result.status.as_ref(),
                result.computed_quantity,
                result.computed_price_a,
                result.computed_price_b
            );
        }
    }
}
