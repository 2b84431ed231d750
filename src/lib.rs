pub mod accounts;
pub mod auth;
pub mod biographer;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod inference;
pub mod models;
pub mod routes;
pub mod store;
pub mod sync;

use askama::Template;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::{extract::State, routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::biographer::Biographer;
use crate::config::Config;
use crate::error::AppError;
use crate::inference::GeminiClient;
use crate::store::EntryStore;
use crate::sync::ViewRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: EntryStore,
    pub views: ViewRegistry,
}

impl AppState {
    pub fn new(db: SqlitePool, biographer: Biographer) -> Self {
        let store = EntryStore::new(db.clone());
        Self {
            views: ViewRegistry::new(store.clone(), biographer),
            store,
            db,
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Pick the biographer for a configuration: online when an inference key is
/// configured and the client can be built, offline otherwise.
pub fn biographer_for(config: &Config) -> Biographer {
    let Some(gemini) = &config.gemini else {
        return Biographer::offline();
    };
    match GeminiClient::new(&gemini.api_key, &gemini.model, &gemini.base_url) {
        Ok(client) => {
            tracing::info!(model = client.model(), "inference enabled");
            Biographer::new(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("Inference disabled: {e}");
            Biographer::offline()
        }
    }
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on `state.db`
/// beforehand. This function sets up the session store (and migrates its
/// table), then assembles all route modules, middleware, and state.
pub async fn build_app(state: AppState, secure_cookies: bool) -> Result<Router, sqlx::Error> {
    let session_store = SqliteStore::new(state.db.clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(30)))
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax);

    Ok(Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::entries::router())
        .merge(routes::story::router())
        .merge(routes::export::router())
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=86400"),
                ))
                .service(ServeDir::new("static")),
        )
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state))
}

#[derive(Template)]
#[template(path = "setup.html")]
struct SetupTemplate {
    problem: String,
}

async fn setup_notice(State(problem): State<String>) -> Result<impl IntoResponse, AppError> {
    let template = SetupTemplate { problem };
    Ok((StatusCode::SERVICE_UNAVAILABLE, Html(template.render()?)))
}

/// Router served when configuration is unusable: every path answers with
/// the setup notice.
pub fn build_setup_app(problem: impl Into<String>) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(setup_notice)
        .with_state(problem.into())
}
