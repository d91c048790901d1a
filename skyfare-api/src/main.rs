use anyhow::Context;
use skyfare_api::{app, seed, worker, AppState};
use skyfare_catalog::{DemandSampler, PricingEngine};
use skyfare_core::InventoryLedger;
use skyfare_order::{BookingManager, MarketUpdater, SimulatedPaymentOracle};
use skyfare_store::{Config, MemoryLedger, PgLedger};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "skyfare_api=debug,skyfare_order=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skyfare API on port {}", config.server.port);

    // Ledger: PostgreSQL when configured, otherwise in memory
    let ledger: Arc<dyn InventoryLedger> = match &config.database.url {
        Some(url) => {
            let pg = PgLedger::connect(&config.database, url, config.booking.lock_timeout())
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                pg.migrate().await.context("Failed to run migrations")?;
            }
            Arc::new(pg)
        }
        None => {
            tracing::warn!("No database configured, bookings will not survive a restart");
            Arc::new(MemoryLedger::new())
        }
    };

    let manager = Arc::new(BookingManager::new(
        ledger,
        Arc::new(PricingEngine::new(config.pricing.clone())),
        Arc::new(SimulatedPaymentOracle::new(config.payment.approval_rate)),
        config.booking.clone(),
    ));

    if config.database.url.is_none() && config.seed.enabled {
        seed::seed_schedule(&manager, &config.seed).await;
    }

    // Market worker
    if config.market.enabled {
        let sampler = DemandSampler::new(&config.market.weights, config.market.shift_probability)
            .context("Invalid market config")?;
        let updater = MarketUpdater::new(manager.clone(), sampler);
        tokio::spawn(worker::start_market_worker(updater, config.market.interval()));
    }

    let app = app(AppState::new(manager));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
