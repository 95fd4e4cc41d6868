use anyhow::{Context, Result};
use paper_trader::api::AppState;
use paper_trader::config::{AppConfig, StoreBackend};
use paper_trader::create_router;
use paper_trader::infrastructure::{HttpPageSource, JsonFileStore, RedisStore, Store};
use paper_trader::market::{HeuristicExtractor, MarketCapExtractor, PageSource};
use paper_trader::services::{LiveTracker, PortfolioPoller, PositionLedger, TradeDesk};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Paper Trader");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    info!("Configuration:");
    info!("  Port: {}", config.port);
    info!("  Store: {:?}", config.store);
    info!("  Page base URL: {}", config.page_base_url);
    info!("  Unit size: {} SOL", config.unit_size);

    let store: Arc<dyn Store> = match &config.store {
        StoreBackend::Json { path } => {
            let store = JsonFileStore::new(path.clone());
            info!("Using JSON store at {}", store.path().display());
            Arc::new(store)
        }
        StoreBackend::Redis { url, key } => Arc::new(
            RedisStore::connect(url, key.clone())
                .await
                .context("Failed to connect to Redis store")?,
        ),
    };

    // Surface a broken store at startup rather than on the first trade
    let state = store.read().await.context("Failed to read store")?;
    info!(
        "Store loaded: {} open positions, {} trades",
        state.positions.len(),
        state.trades.len()
    );

    let ledger = Arc::new(PositionLedger::new(store));
    let pages: Arc<dyn PageSource> = Arc::new(HttpPageSource::new(config.page_base_url.clone()));
    let extractor: Arc<dyn MarketCapExtractor> = Arc::new(HeuristicExtractor::new());

    let desk = Arc::new(TradeDesk::new(
        Arc::clone(&ledger),
        Arc::clone(&pages),
        Arc::clone(&extractor),
        config.unit_size,
    ));

    let tracker = Arc::new(LiveTracker::new(
        Arc::clone(&ledger),
        pages,
        extractor,
        config.tracker.clone(),
    ));
    let portfolio = Arc::new(PortfolioPoller::new(
        Arc::clone(&ledger),
        config.portfolio.clone(),
    ));

    // Background polling loops live as long as their handles
    let tracker_task = tracker.start();
    let portfolio_task = portfolio.start();

    let app_state = AppState {
        ledger,
        desk,
        tracker,
        portfolio,
    };

    // Create router with middleware
    let app = create_router(app_state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start HTTP server
    let addr = format!("0.0.0.0:{}", config.port);
    info!("HTTP server starting on {}", addr);
    info!("WebSocket available at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    for task in [tracker_task, portfolio_task] {
        if task.is_finished() {
            warn!("{} exited before shutdown", task.name());
        }
        task.cancel().await;
    }

    Ok(())
}
