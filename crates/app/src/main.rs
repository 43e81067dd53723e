//! Stockbridge CLI
//!
//! Command-line front end of the MDM to catalog stock bridge.
//!
//! # Commands
//!
//! - `list` - Print one page of the inventory grid
//! - `sync` - Push selected grid rows to the catalog
//! - `sync-all` - Ask the gateway to push a whole source
//! - `mark-changed` - Flag the rows of a source that differ from the catalog
//! - `stock` - Show what the catalog holds for a SKU
//! - `probe` - Check that a transport answers
//! - `metrics` - Print the client status and counters
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use stockbridge_app::commands;
use stockbridge_app::{AppContext, GridFilter};
use stockbridge_core::SyncEvent;
use stockbridge_domain::{FilterSpec, SortDirection, SortSpec, TransportKind};
use stockbridge_infra::{config, global, init_tracing, CatalogClient};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Sync MDM stock levels to the e-commerce catalog.
#[derive(Parser)]
#[command(name = "stockbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (TOML or JSON); the standard locations are probed when omitted
    #[arg(global = true, short, long, env = "STOCKBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override `directEnabled` from the configuration
    #[arg(global = true, long)]
    direct: Option<bool>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Branch number, or "all"
    #[arg(long)]
    branch: Option<String>,

    /// MDM source code, or "all"
    #[arg(long)]
    source: Option<String>,

    /// Only rows flagged as changed
    #[arg(long)]
    changed_only: bool,

    #[arg(long, default_value = "0")]
    page: u32,

    #[arg(long)]
    page_size: Option<u32>,

    /// Sort field (defaults to lastUpdatedAt, newest first)
    #[arg(long)]
    sort: Option<String>,

    /// Sort ascending
    #[arg(long, requires = "sort")]
    asc: bool,

    /// Extra equality filter, `field=value`
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<FilterSpec>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of the inventory grid
    List(FilterArgs),

    /// Push selected rows (`{sourceCode}-{sku}`) of the listed page
    Sync {
        #[command(flatten)]
        filter: FilterArgs,

        /// Row keys to push
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Ask the gateway to push every row of a source
    SyncAll {
        /// Concrete MDM source code
        source: String,
    },

    /// Flag the rows of a source that differ from the catalog as changed
    MarkChanged {
        /// Concrete MDM source code
        source: String,
    },

    /// Show what the catalog holds for a SKU
    Stock {
        sku: String,

        /// Restrict to the catalog source of this MDM source code
        #[arg(long)]
        source: Option<String>,
    },

    /// Check that a transport answers
    Probe {
        /// direct, proxy or mdm
        #[arg(default_value = "proxy")]
        transport: TransportKind,
    },

    /// Print the client status and counters
    Metrics,
}

fn parse_filter(raw: &str) -> Result<FilterSpec, String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok(FilterSpec::equals(field.trim(), value.trim()))
        }
        _ => Err(format!("expected field=value, got '{raw}'")),
    }
}

impl FilterArgs {
    fn into_filter(self, ctx: &AppContext) -> GridFilter {
        let defaults = ctx.default_filter();
        GridFilter {
            branch: self.branch.unwrap_or(defaults.branch),
            source_code: self.source.unwrap_or(defaults.source_code),
            changed_only: self.changed_only,
            page: self.page,
            page_size: self.page_size.unwrap_or(defaults.page_size),
            sort: self.sort.map(|field| {
                let direction = if self.asc { SortDirection::Asc } else { SortDirection::Desc };
                SortSpec::new(field, direction)
            }),
            filters: self.filters,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Log progress events until the run finishes.
fn spawn_progress_logger(ctx: &AppContext) -> tokio::task::JoinHandle<()> {
    let mut events = ctx.subscribe_progress();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Progress(event)) => info!(
                    stage = %event.stage,
                    current = event.current,
                    total = event.total,
                    message = event.last_message.as_deref().unwrap_or(""),
                    "sync progress"
                ),
                Ok(SyncEvent::Finished(notification)) => {
                    if !notification.silent {
                        info!(state = ?notification.state, "{}", notification.message);
                    }
                    break;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "progress logger fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        config::load_from(cli.config.clone()).context("failed to load configuration")?;
    if let Some(direct) = cli.direct {
        settings.direct_enabled = direct;
        settings.validate()?;
    }
    let level = if cli.verbose { "debug" } else { settings.log_level.as_str() };
    init_tracing(level, settings.log_json)?;

    let client = global::install(CatalogClient::new(settings)?)?;
    let ctx = AppContext::with_client(client);

    let outcome = run(&ctx, cli.command).await;
    ctx.shutdown();
    outcome
}

async fn run(ctx: &AppContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List(filter) => {
            let page = commands::list_inventory(ctx, filter.into_filter(ctx)).await?;
            print_json(&page)
        }
        Commands::Sync { filter, keys } => {
            commands::list_inventory(ctx, filter.into_filter(ctx)).await?;
            let logger = spawn_progress_logger(ctx);
            let outcome = commands::sync_selected(ctx, &keys).await?;
            logger.await?;
            print_json(&outcome)?;
            if !outcome.unknown_keys.is_empty() {
                bail!("{} key(s) were not on the listed page", outcome.unknown_keys.len());
            }
            Ok(())
        }
        Commands::SyncAll { source } => {
            let logger = spawn_progress_logger(ctx);
            let report = commands::sync_all_for_source(ctx, &source).await?;
            logger.await?;
            print_json(&report)
        }
        Commands::MarkChanged { source } => {
            let logger = spawn_progress_logger(ctx);
            let report = commands::mark_stocks_changed(ctx, &source).await?;
            logger.await?;
            print_json(&report)
        }
        Commands::Stock { sku, source } => {
            let page = commands::catalog_stock(ctx, &sku, source.as_deref()).await?;
            print_json(&page)
        }
        Commands::Probe { transport } => {
            let report = commands::probe_transport(ctx, transport).await?;
            print_json(&report)
        }
        Commands::Metrics => print_json(&commands::get_metrics(ctx)),
    }
}
