use sta_mock::config::{Config, StoreBackend};
use sta_mock::http_server::StaServer;
use sta_mock::registry::SessionRegistry;
use sta_mock::shutdown::{ShutdownCoordinator, ShutdownSignal};
use sta_mock::store::{HttpStore, MemoryStore, ObjectStore};
use sta_mock::{logging, Result, StaError};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.logging)?;

    info!("starting STA mock v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn ObjectStore> = match config.store.backend {
        StoreBackend::Memory => {
            info!("store backend: in-memory (finalized uploads are lost on exit)");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Http => {
            info!(
                "store backend: {} bucket {}",
                config.store.endpoint, config.store.bucket
            );
            Arc::new(HttpStore::new(&config.store.endpoint, &config.store.bucket))
        }
    };

    if config.auth.enabled {
        info!("basic-auth gate enabled for user {}", config.auth.username);
    } else {
        info!("basic-auth gate disabled");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .map_err(|e| StaError::ConfigError(format!("invalid listen address: {}", e)))?;

    let registry = Arc::new(SessionRegistry::new());
    let server = Arc::new(StaServer::new(Arc::new(config), registry, store));

    let coordinator = ShutdownCoordinator::new();
    let server_shutdown = ShutdownSignal::new(coordinator.subscribe());

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.start(addr, server_shutdown).await {
            error!("server failed: {}", e);
        }
    });

    coordinator.listen_for_shutdown().await?;
    server_task.await.ok();

    info!("STA mock shutdown complete");
    Ok(())
}
