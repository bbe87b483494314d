use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use stagedoor_api::{app, AppState};
use stagedoor_booking::MemoryBookingStore;
use stagedoor_coordinator::{Coordinator, Reaper};
use stagedoor_ledger::{MemoryLedgerStore, SeatLedger};
use stagedoor_store::{Config, MemoryEventCatalog, MemoryUserDirectory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagedoor_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Stagedoor API on port {}", config.server.port);

    let ledger = SeatLedger::new(
        Arc::new(MemoryLedgerStore::new()),
        config.business_rules.reserve_max_retries,
    );
    let bookings = Arc::new(MemoryBookingStore::new());
    let catalog = Arc::new(MemoryEventCatalog::new());
    let directory = Arc::new(MemoryUserDirectory::new());

    // Until the real user directory is wired in, seed one demo user so the
    // surface is exercisable out of the box.
    let demo_user = Uuid::new_v4();
    directory.add(demo_user);
    tracing::info!(user_id = %demo_user, "seeded demo user");

    let coordinator = Arc::new(Coordinator::new(
        ledger.clone(),
        bookings.clone(),
        catalog.clone(),
        directory.clone(),
        Duration::seconds(config.business_rules.hold_duration_seconds as i64),
    ));

    let reaper = Reaper::new(
        ledger.clone(),
        bookings,
        std::time::Duration::from_secs(config.business_rules.reaper_interval_seconds),
    );
    tokio::spawn(reaper.run());

    let app_state = AppState {
        coordinator,
        ledger,
        catalog,
        directory,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
