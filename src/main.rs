use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bridge_tracker::chain::rpc::RpcChainClient;
use bridge_tracker::chain::ChainClient;
use bridge_tracker::config::{BridgeConfig, Config};
use bridge_tracker::db::repository::PgCheckpointStore;
use bridge_tracker::db::CheckpointStore;
use bridge_tracker::tokens::registry::TokenRegistry;
use bridge_tracker::tracker::price::PriceTracker;
use bridge_tracker::tracker::transaction::TransactionTracker;
use bridge_tracker::tracker::tvl::TvlTracker;
use bridge_tracker::tracker::worker::{spawn_polling, WorkerHandle};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    init_logging(&config);
    tracing::info!(
        networks = config.networks.len(),
        bridges = config.bridges.len(),
        "Configuration loaded from {}",
        config_path
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let store: Arc<dyn CheckpointStore> = Arc::new(PgCheckpointStore::new(pool.clone()));

    let shutdown = CancellationToken::new();

    // One client per network, shared by every tracker on it.
    let mut clients: HashMap<String, Arc<dyn ChainClient>> = HashMap::new();
    for network in &config.networks {
        let client = RpcChainClient::new(network, shutdown.clone())?;
        clients.insert(network.name.clone(), Arc::new(client));
    }

    let mut workers: Vec<WorkerHandle> = Vec::new();

    for bridge in &config.bridges {
        let Some(client) = clients.get(&bridge.network) else {
            // validate() guarantees the network exists
            continue;
        };

        match start_bridge(bridge, client.clone(), store.clone(), &shutdown).await {
            Ok(mut started) => workers.append(&mut started),
            Err(e) => {
                tracing::error!(
                    bridge = %bridge.name,
                    network = %bridge.network,
                    error = %e,
                    "Failed to start bridge, its trackers will not run"
                );
            }
        }
    }

    if workers.is_empty() {
        return Err(eyre::eyre!("No bridge tracker could be started"));
    }

    if let Some(price) = config.price.as_ref().filter(|p| p.enabled) {
        let tracker = PriceTracker::new(price, store.clone())?;
        workers.push(spawn_polling(
            tracker,
            Duration::from_secs(price.interval_secs),
            &shutdown,
        ));
    }

    let api = if config.api.enabled {
        let api_pool = pool.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        let api_shutdown = shutdown.child_token();
        Some(tokio::spawn(async move {
            if let Err(e) = bridge_tracker::api::serve(api_pool, &host, port, api_shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        }))
    } else {
        None
    };

    tracing::info!(
        workers = workers.len(),
        "All trackers started. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping all trackers...");
    shutdown.cancel();

    futures::future::join_all(workers.into_iter().map(WorkerHandle::join)).await;
    if let Some(api) = api {
        if let Err(e) = api.await {
            if e.is_panic() {
                tracing::error!(error = %e, "API server task panicked");
            } else {
                tracing::warn!(error = %e, "API server task aborted");
            }
        }
    }

    pool.close().await;
    tracing::info!("Bridge tracker stopped gracefully");
    Ok(())
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolve a bridge's token registry, then spawn one worker per direction
/// plus its TVL sampler. Nothing is spawned if resolution fails.
async fn start_bridge(
    bridge: &BridgeConfig,
    client: Arc<dyn ChainClient>,
    store: Arc<dyn CheckpointStore>,
    shutdown: &CancellationToken,
) -> eyre::Result<Vec<WorkerHandle>> {
    let lists = bridge.token_lists()?;
    let safe = bridge.safe_address()?;
    let directions = bridge.directions()?;

    let registry = TokenRegistry::resolve(client.as_ref(), &lists).await?;
    tracing::info!(
        bridge = %bridge.name,
        tokens = registry.len(),
        symbols = ?registry.symbols(),
        "Token registry resolved"
    );
    let registry = Arc::new(registry);

    let mut workers = Vec::with_capacity(directions.len() + 1);
    for direction in directions {
        let interval = direction.poll_interval;
        let tracker =
            TransactionTracker::new(direction, client.clone(), store.clone(), registry.clone());
        workers.push(spawn_polling(tracker, interval, shutdown));
    }

    let tvl = TvlTracker::new(bridge.name.clone(), safe, client, store, registry);
    workers.push(spawn_polling(tvl, bridge.tvl_interval(), shutdown));

    Ok(workers)
}
