//! givecore - deliver one grant from the command line.
//!
//! Usage: `givecore <config.toml> <request.toml>`

use std::sync::Arc;

use anyhow::Context as _;
use givecore::config::{self, Config, RequestFile};
use givecore::notify::RconConsoleFactory;
use givecore::store::SqlStoreProvider;
use givecore::{DeliveryContext, DriverRegistry};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "givecore.toml".to_string());
    let request_path = args
        .next()
        .context("usage: givecore <config.toml> <request.toml>")?;

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    let request = RequestFile::load(&request_path)
        .with_context(|| format!("failed to load request {request_path}"))?
        .into_request(&config)?;

    info!(
        driver = %request.driver,
        server = %request.server.name,
        user = %request.user.name,
        "Starting delivery"
    );

    let ctx = DeliveryContext::from_config(
        &config.delivery,
        Arc::new(SqlStoreProvider::new(config.databases.clone())),
        Arc::new(RconConsoleFactory),
    );
    let registry = DriverRegistry::with_defaults();

    let report = registry.dispatch(&ctx, &request).await?;
    info!(
        change = report.change.map(|c| c.as_str()),
        expires = report.expires,
        notified = report.notified,
        commands_sent = report.commands_sent,
        commands_skipped = report.commands_skipped.len(),
        "Delivery complete"
    );
    Ok(())
}
