use campus_events::config::{environment::Config, init_db};
use campus_events::modules::user::service::ensure_super_admin;
use campus_events::services::{
    image_store::LocalImageStore, jwt::JwtService, mailer::TracingMailer,
    metrics::MetricsRegistry, realtime::RealtimeHub,
};
use campus_events::store::MySqlStore;
use campus_events::{AppState, Settings};
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let db = init_db(&config.database_url).await?;
    tracing::info!("Connected to MySQL, migrations applied");
    let store = Arc::new(MySqlStore::new(db));

    if let Some(seed) = &config.super_admin {
        ensure_super_admin(store.as_ref(), seed).await?;
    }

    let images = LocalImageStore::new(&config.upload_dir, &config.public_base_url).await?;
    tracing::info!(dir = %images.root().display(), "Serving uploads");

    let jwt_service = JwtService::new(
        config.jwt_access_secret.clone(),
        config.jwt_refresh_secret.clone(),
    )
    .with_durations(
        Duration::minutes(config.access_token_ttl_minutes),
        Duration::days(config.refresh_token_ttl_days),
    );

    let state = AppState {
        store,
        jwt_service,
        realtime: Arc::new(RealtimeHub::default()),
        images: Arc::new(images),
        mailer: Arc::new(TracingMailer),
        metrics: MetricsRegistry::new()?,
        settings: Settings::from_config(&config),
    };

    let app = campus_events::create_app(state).await;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
