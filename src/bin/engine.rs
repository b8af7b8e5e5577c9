use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use kpi_sync::{
    Quantity, ValueType,
    config::read_registry_file,
    notify::Notifier,
    sync::supervisor::Supervisor,
    update::{MemoryStore, UpdateService},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Registry file
    #[arg(short, default_value = "registry.json")]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("kpi_sync", LevelFilter::TRACE),
        ("engine", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let registry = read_registry_file(&args.file)?;

    let store = Arc::new(MemoryStore::new());

    // The standalone engine has no surrounding document store, so seed one
    // text quantity per target so updates have somewhere to land.
    for connection in &registry.connections {
        store
            .insert_quantity(Quantity {
                id: connection.element_id.clone(),
                current_value: String::new(),
                value_type: ValueType::Text,
                last_updated: Utc::now(),
            })
            .await;
    }

    let updater = Arc::new(UpdateService::new(store));
    let notifier = Notifier::new(256);

    // First subscriber: make value changes operator-visible
    let mut events = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(
                "{} changed to {:?} at {}",
                event.quantity_id, event.value, event.timestamp
            );
        }
    });

    let mut supervisor = Supervisor::new(updater, notifier);
    supervisor.start(&registry).await;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    supervisor.shutdown().await;

    Ok(())
}
