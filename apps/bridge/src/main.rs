use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{builder::PossibleValuesParser, Parser, Subcommand};
use client_core::{
    check_health,
    entities::{DiscoveredEntity, EntityTracker},
    NowPlayingClient, SharedRegistry,
};
use shared::{
    domain::{BACKGROUNDS, FONTS, LAYOUTS},
    protocol::PushSettings,
};
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(about = "Mirrors a Now Playing server's displays and pushes settings to them")]
struct Args {
    #[arg(long, default_value = "bridge.toml")]
    config: PathBuf,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    reconnect_interval_secs: Option<u64>,
    #[arg(long)]
    skip_health_check: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the live feed until Ctrl-C.
    Watch,
    /// Push settings to the display with the given friendly name.
    Push(PushArgs),
}

#[derive(clap::Args, Debug)]
struct PushArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = PossibleValuesParser::new(LAYOUTS.iter().copied()))]
    layout: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(FONTS.iter().copied()))]
    font: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(BACKGROUNDS.iter().copied()))]
    background: Option<String>,
    /// Zone display name, resolved to its id through the live zone list.
    #[arg(long)]
    zone: Option<String>,
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config)?;
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(secs) = args.reconnect_interval_secs {
        settings.reconnect_interval_secs = secs;
    }

    if !args.skip_health_check {
        check_health(&settings.base_url, settings.health_timeout())
            .await
            .with_context(|| format!("server at {} is not reachable", settings.base_url))?;
        info!(base_url = %settings.base_url, "server healthy");
    }

    let client = NowPlayingClient::new(settings.client_config()?)?;
    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(client).await,
        Command::Push(push_args) => push(client, push_args).await,
    }
}

async fn watch(client: Arc<NowPlayingClient>) -> Result<()> {
    let registry = client.registry().clone();
    let summary = client.add_listener(move || log_summary(&registry));

    let tracker = Arc::new(EntityTracker::new());
    let registry = client.registry().clone();
    let discovery = tracker.attach(&client, move |found| {
        for entity in found {
            log_entity(&registry, &entity);
        }
    });

    client.start();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    client.stop().await;
    summary.remove();
    discovery.remove();
    Ok(())
}

fn log_summary(registry: &SharedRegistry) {
    registry.read(|registry| {
        let named = registry.named_clients();
        let online = named.iter().filter(|client| !client.disconnected).count();
        info!(
            connected = registry.is_connected(),
            clients = named.len(),
            online,
            zones = registry.zones().len(),
            "registry updated"
        );
    });
}

fn log_entity(registry: &SharedRegistry, entity: &DiscoveredEntity) {
    match entity {
        DiscoveredEntity::Select(select) => info!(
            unique_id = %select.unique_id(),
            options = select.options(registry).len(),
            current = ?select.current_option(registry),
            "select discovered"
        ),
        DiscoveredEntity::Connectivity(sensor) => info!(
            unique_id = %sensor.unique_id(),
            name = %sensor.display_name(registry),
            on = sensor.is_on(registry),
            "connectivity sensor discovered"
        ),
    }
}

async fn push(client: Arc<NowPlayingClient>, args: PushArgs) -> Result<()> {
    let PushArgs {
        name,
        layout,
        font,
        background,
        zone,
        wait_secs,
    } = args;
    let mut settings = PushSettings {
        layout,
        font,
        background,
        zone_id: None,
    };
    if settings.is_empty() && zone.is_none() {
        bail!("nothing to push: pass at least one of --layout, --font, --background or --zone");
    }

    let changed = Arc::new(Notify::new());
    let waker = Arc::clone(&changed);
    let listener = client.add_listener(move || waker.notify_one());
    client.start();

    let ready = tokio::time::timeout(Duration::from_secs(wait_secs), async {
        loop {
            let registry = client.registry();
            let target = registry.client_by_name(&name);
            let zone_ready = match &zone {
                Some(zone) => registry.zone_id_for(zone).is_some(),
                None => true,
            };
            if let (Some(target), true) = (target, zone_ready) {
                return target;
            }
            changed.notified().await;
        }
    })
    .await;
    listener.remove();

    let result = match ready {
        Ok(target) => {
            if let Some(zone) = &zone {
                settings.zone_id = client.zone_id_for(zone);
            }
            client
                .pusher()
                .try_push(&target.client_id, &settings)
                .await
                .with_context(|| format!("push to '{name}' failed"))
        }
        Err(_) => {
            warn!(name = %name, "display did not appear in time");
            Err(anyhow::anyhow!(
                "no display named '{}' (or zone '{}') seen within {}s",
                name,
                zone.as_deref().unwrap_or("-"),
                wait_secs
            ))
        }
    };

    client.stop().await;
    result?;
    info!(%name, "settings pushed");
    Ok(())
}
