use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use boxoffice_api::{app, AppState};
use boxoffice_booking::{BookingPolicy, InventoryController};
use boxoffice_core::{EventCache, SeatLock, TicketStore};
use boxoffice_store::{DbClient, EventProducer, PostgresTicketStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "boxoffice_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = boxoffice_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Boxoffice API on port {}", config.server.port);

    // Postgres Connection + migrations
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis Connection (cache + seat locks)
    let redis = Arc::new(
        RedisClient::new(&config.redis.url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // Kafka Connection
    let kafka = Arc::new(
        EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer"),
    );

    let policy = BookingPolicy {
        lock_ttl: Duration::from_secs(config.business_rules.seat_lock_ttl_seconds),
        lock_wait: Duration::from_millis(config.business_rules.seat_lock_wait_ms),
        cache_ttl: Duration::from_secs(config.business_rules.cache_ttl_seconds),
    };

    let store: Arc<dyn TicketStore> = Arc::new(PostgresTicketStore::new(db.pool.clone()));
    let lock: Arc<dyn SeatLock> = redis.clone();
    let cache: Arc<dyn EventCache> = redis.clone();
    let controller = Arc::new(InventoryController::new(store, lock, cache, policy));

    let app_state = AppState {
        controller,
        kafka,
        redis,
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
