mod adapters;
mod application;
mod config;
mod domain;
mod error;
mod interface;
mod ports;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{SimSource, WebhookForwarder};
use application::Monitor;
use config::{Config, FleetFile};
use domain::ConnectionKind;
use interface::http::create_router;
use ports::DeviceSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fleetmon={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting FleetMon v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);

    // Device collaborators. The simulator answers every connection kind
    // until a real device client is registered here.
    let sim = Arc::new(SimSource::new());
    let mut sources: HashMap<ConnectionKind, Arc<dyn DeviceSource>> = HashMap::new();
    for kind in [ConnectionKind::Api, ConnectionKind::Snmp, ConnectionKind::Ssh] {
        sources.insert(kind, sim.clone());
    }

    // Create the monitor
    let monitor = Monitor::new(config.monitor_config(), sources, None);
    info!("✓ Monitor initialized");

    // Load the fleet file (devices + webhook targets)
    if let Some(path) = &config.fleet_file {
        match FleetFile::load(path) {
            Ok(fleet) => {
                for entry in fleet.devices {
                    monitor.add_device(entry.into_device());
                }
                if !fleet.webhooks.is_empty() {
                    info!("✓ Forwarding alerts to {} webhook(s)", fleet.webhooks.len());
                    let _ = WebhookForwarder::new(fleet.webhooks).spawn(monitor.subscribe());
                }
                info!("✓ Loaded fleet file {}", path.display());
            }
            Err(e) => {
                warn!("⚠ Failed to load fleet file {}: {}", path.display(), e);
            }
        }
    }

    monitor.start();
    info!("✓ Monitoring {} device(s)", monitor.list_devices().len());

    // Create HTTP server
    let app = create_router(monitor.clone());
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✓ FleetMon listening on {}", addr);
    info!("  → Devices: http://localhost:{}/api/devices", config.port);
    info!("  → Stats: http://localhost:{}/api/stats", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    monitor.stop().await;

    Ok(())
}
