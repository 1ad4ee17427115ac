pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use reqwest::Client;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::require_bearer_auth;
use crate::middleware::rate_limit::{new_rps_state, rps_middleware};
use crate::realtime::ChangeFeed;
use crate::services::audit_service::AuditService;
use crate::services::meta_service::{MetaClient, WhatsappApi};
use crate::services::send_service::SendService;
use crate::services::settings_service::SettingsService;
use crate::services::store::{PgStore, StoreGateway};
use crate::services::template_service::TemplateService;
use crate::utils::session_window;
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreGateway>,
    pub provider: Arc<dyn WhatsappApi>,
    pub templates: TemplateService,
    pub sender: SendService,
    pub settings: SettingsService,
    pub feed: ChangeFeed,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let feed = ChangeFeed::new();
        let store: Arc<dyn StoreGateway> = Arc::new(PgStore::new(pool, feed.clone()));
        let provider: Arc<dyn WhatsappApi> = Arc::new(MetaClient::new(http_client));

        Self::assemble(store, provider, feed)
    }

    /// Wires the service graph over caller-supplied gateways. Integration
    /// tests use this to exercise the full router without Postgres or Meta.
    pub fn from_parts(
        store: Arc<dyn StoreGateway>,
        provider: Arc<dyn WhatsappApi>,
        feed: ChangeFeed,
    ) -> Self {
        Self::assemble(store, provider, feed)
    }

    fn assemble(
        store: Arc<dyn StoreGateway>,
        provider: Arc<dyn WhatsappApi>,
        feed: ChangeFeed,
    ) -> Self {
        let config = crate::config::get_config();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let templates =
            TemplateService::new(provider.clone(), clock.clone(), config.meta_waba_id.clone());
        let audit = AuditService::new(store.clone());
        let sender = SendService::new(
            store.clone(),
            provider.clone(),
            templates.clone(),
            audit.clone(),
            clock,
            config.template_cost_estimate,
        );
        let settings = SettingsService::new(store.clone(), provider.clone(), audit);

        Self {
            store,
            provider,
            templates,
            sender,
            settings,
            feed,
        }
    }
}

/// Background loop that flips lapsed `active` session snapshots to
/// `expired`. Each pass logs the flipped count at debug level.
pub async fn run_session_sweeper(store: Arc<dyn StoreGateway>, interval: std::time::Duration) {
    loop {
        match store
            .sweep_expired_sessions(session_window::window_start(Utc::now()))
            .await
        {
            Ok(flipped) => {
                tracing::debug!("Session sweeper pass expired {} contact(s)", flipped)
            }
            Err(e) => tracing::error!(error = ?e, "Session sweeper error"),
        }
        tokio::time::sleep(interval).await;
    }
}

/// Full HTTP surface. Everything under `/api` requires a bearer token;
/// the send endpoints additionally share the `SEND_RPS` limiter.
pub fn build_router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let send_api = Router::new()
        .route("/api/messages/send", post(routes::messages::send_text))
        .route(
            "/api/messages/send-image",
            post(routes::messages::send_image),
        )
        .route(
            "/api/messages/send-template",
            post(routes::messages::send_template),
        )
        .route(
            "/api/settings/test-notification",
            post(routes::settings::send_test_notification),
        )
        .layer(axum::middleware::from_fn_with_state(
            new_rps_state(config.send_rps),
            rps_middleware,
        ))
        .layer(axum::middleware::from_fn(require_bearer_auth));

    let console_api = Router::new()
        .route("/api/messages/mark-read", post(routes::messages::mark_read))
        .route("/api/templates", get(routes::templates::list_templates))
        .route("/api/contacts", get(routes::contacts::list_contacts))
        .route(
            "/api/contacts/:phone/messages",
            get(routes::contacts::contact_messages),
        )
        .route(
            "/api/contacts/lookup",
            post(routes::contacts::lookup_contact),
        )
        .route("/api/activity", get(routes::activity::list_activity))
        .route("/api/activity/stats", get(routes::activity::activity_stats))
        .route(
            "/api/settings",
            get(routes::settings::get_settings).post(routes::settings::update_settings),
        )
        .route("/api/events", get(routes::events::stream_events))
        .layer(axum::middleware::from_fn(require_bearer_auth));

    base_routes
        .merge(send_api)
        .merge(console_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}
