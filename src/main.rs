//! CRM Sync - Command Line Entry Point
//!
//! Loads one CRM list the way a list view would (debounced search, filters,
//! scroll-triggered pages) and prints the records as JSON lines.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crm_sync::domain::EntityKind;
use crm_sync::helpers::{get_or_create_data_dir, load_config};
use crm_sync::services::SyncHub;
use crm_sync::sync::{InfiniteCache, PageFetcher};

#[derive(Parser, Debug)]
#[command(name = "crm-sync", version, about = "Page through a CRM list and print it as JSON lines")]
struct Cli {
    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(long, env = "CRM_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the configuration
    #[arg(long, env = "CRM_SYNC_BASE_URL")]
    base_url: Option<String>,

    /// List to load: clients, accounts, transactions, agents, communications, logs
    #[arg(long, short)]
    resource: EntityKind,

    /// Owning record (agent for clients, client for accounts, ...)
    #[arg(long)]
    owner: Option<String>,

    /// Search text
    #[arg(long, short, default_value = "")]
    search: String,

    /// Filter as name=value, repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("filter name is empty in {s:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Log to stderr and to a daily file in the data directory
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    match get_or_create_data_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "crm-sync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    let hub = SyncHub::new(config).context("starting sync hub")?;

    tracing::info!(resource = %cli.resource, pages = cli.pages, "Starting CRM sync...");

    let printed = match cli.resource {
        EntityKind::Clients => dump(&hub, hub.clients(), &cli).await?,
        EntityKind::Accounts => dump(&hub, hub.accounts(), &cli).await?,
        EntityKind::Transactions => dump(&hub, hub.transactions(), &cli).await?,
        EntityKind::Agents => dump(&hub, hub.agents(), &cli).await?,
        EntityKind::Communications => dump(&hub, hub.communications(), &cli).await?,
        EntityKind::AdminLogs => dump(&hub, hub.admin_logs(), &cli).await?,
    };

    for event in hub.events().try_iter() {
        tracing::debug!(?event, "sync event");
    }
    tracing::info!(records = printed, "done");
    Ok(())
}

/// Load up to `cli.pages` pages into a list view and print its rows
async fn dump<F>(hub: &SyncHub, cache: &InfiniteCache<F>, cli: &Cli) -> Result<usize>
where
    F: PageFetcher,
    F::Record: Serialize,
{
    let mut list = hub.controller(cache);
    list.set_owner(cli.owner.as_deref());
    for (name, value) in &cli.filters {
        list.set_filter(name.as_str(), value.as_str());
    }

    if cli.search.is_empty() {
        list.sync().await?;
    } else {
        list.set_search(&cli.search);
        list.search_settled().await?;
    }

    for _ in 1..cli.pages {
        let view = list.view();
        if !view.has_next || view.rows.is_empty() {
            break;
        }
        if list.on_row_visible(view.rows.len() - 1).await?.is_none() {
            break;
        }
    }

    let view = list.view();
    if let Some(error) = view.error {
        bail!("{}: {}", cli.resource, error);
    }
    for row in &view.rows {
        println!("{}", serde_json::to_string(row)?);
    }
    if view.shows_empty_state() {
        tracing::info!(key = ?view.key, "no records match");
    }
    Ok(view.rows.len())
}
