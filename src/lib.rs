pub mod config;
pub mod error;
pub mod extract;
pub mod modules;
pub mod services;
pub mod store;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};

use config::Config;
use modules::auth::{auth_routes, service::SessionService};
use modules::event::{event_routes, service::EventService};
use modules::metrics::metrics_routes;
use modules::notification::{controller::ws_handler, notification_routes};
use modules::password::{password_routes, service::PasswordService};
use modules::user::user_routes;
use services::image_store::ImageStore;
use services::jwt::JwtService;
use services::mailer::Mailer;
use services::metrics::{metrics_middleware, MetricsRegistry};
use services::rate_limit::{create_rate_limiter, RateLimitLayer};
use services::realtime::RealtimeHub;
use services::security::security_headers;
use store::Store;

/// JSON bodies outside the event routes.
const JSON_BODY_LIMIT: usize = 1024 * 100;
/// Room for the text fields of an event form next to its poster.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Runtime knobs derived from `Config`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cookie_secure: bool,
    pub max_image_bytes: usize,
    pub auth_rate_limit_burst: u32,
    /// Directory served under `/uploads`, when posters live on local disk.
    pub uploads_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cookie_secure: config.production,
            max_image_bytes: config.max_image_bytes,
            auth_rate_limit_burst: config.auth_rate_limit_burst,
            uploads_dir: Some(PathBuf::from(&config.upload_dir)),
        }
    }
}

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt_service: JwtService,
    pub realtime: Arc<RealtimeHub>,
    pub images: Arc<dyn ImageStore>,
    pub mailer: Arc<dyn Mailer>,
    pub metrics: Arc<MetricsRegistry>,
    pub settings: Settings,
}

impl AppState {
    pub fn sessions(&self) -> SessionService<'_> {
        SessionService::new(self.store.as_ref(), &self.jwt_service, &self.metrics)
    }

    pub fn passwords(&self) -> PasswordService<'_> {
        PasswordService::new(self.store.as_ref(), self.mailer.as_ref())
    }

    pub fn events(&self) -> EventService<'_> {
        EventService::new(
            self.store.as_ref(),
            self.images.as_ref(),
            self.realtime.as_ref(),
            &self.metrics,
        )
    }
}

pub async fn create_app(state: AppState) -> Router {
    let state = Arc::new(state);
    let settings = state.settings.clone();

    // Credential endpoints share one limiter per group.
    let auth = auth_routes()
        .layer(RateLimitLayer::new(create_rate_limiter(settings.auth_rate_limit_burst)))
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT));
    let password = password_routes()
        .layer(RateLimitLayer::new(create_rate_limiter(settings.auth_rate_limit_burst)))
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT));
    let events = event_routes()
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.max_image_bytes + MULTIPART_OVERHEAD));

    let mut app = Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_handler))
        .merge(metrics_routes())
        .nest("/auth", auth)
        .nest("/password", password)
        .nest("/event", events)
        .nest(
            "/notification",
            notification_routes().layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT)),
        )
        .nest("/users", user_routes().layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT)));

    if let Some(dir) = &settings.uploads_dir {
        app = app.nest_service("/uploads", ServeDir::new(dir));
    }

    app.layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Campus Events API"
}
