//! # sima: records management for a LAN-bound police unit
//!
//! S.I.M.A. (Sistema de Información de Mencionados y Aprehendidos) tracks
//! registered persons (personas) and their associated criminal-record
//! entries (registros delictuales) for a small organization operating over
//! a local network. It exposes a JSON HTTP API with authentication,
//! role-based authorization, photo attachment, text search, CSV/XLSX
//! export and a full audit trail of mutations.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum)
//! for the HTTP layer and SQLite (via SQLx) for persistence - a deliberate
//! single-node choice: the deployment target is one box on a LAN, and the
//! database file plus the uploads directory are the whole state.
//!
//! ### Request flow
//!
//! Every protected request carries a bearer access token. The extractors
//! in [`auth::current_user`] verify it cryptographically (no database
//! round-trip) and attach the decoded identity; a second extractor layers
//! the admin-role check on top. Handlers then sanitize and validate input
//! against the declarative schemas in [`validation`], enforce entity
//! invariants through the repositories in [`db::handlers`], and finally
//! emit a best-effort audit entry. Audit writes are intentionally outside
//! the primary transaction: their failure is logged and absorbed, never
//! surfaced.
//!
//! ### Token lifecycle
//!
//! Two signed tokens are issued per login: a short-lived access token and
//! a long-lived refresh token, with distinct signing secrets. Server-side
//! revocation is a per-user `token_version` counter embedded in every
//! token: password changes and explicit revocation bump it, and the
//! refresh path rejects any token carrying a stale version. Access-token
//! checks skip the counter on purpose, bounding revocation propagation to
//! the access-token lifetime.
//!
//! ## Quick start
//!
//! ```no_run
//! use clap::Parser;
//! use sima::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = sima::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     sima::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod metrics;
mod openapi;
pub mod sanitize;
pub mod telemetry;
pub mod types;
pub mod uploads;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use crate::{
    api::handlers::{audit, auth as auth_handlers, personas, registros, system, usuarios},
    auth::password,
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    metrics::Metrics,
    openapi::ApiDoc,
    uploads::UploadStore,
};

pub use config::Config;
pub use errors::Error;

/// Embedded database migrations, run automatically on startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub metrics: Arc<Metrics>,
    pub uploads: Arc<UploadStore>,
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    // Multipart bodies carry up to max_files photos plus the form fields
    let body_limit = state.config.uploads.max_file_size * state.config.uploads.max_files + 1024 * 1024;
    let cors = cors_layer(&state.config);
    let uploads_dir = state.uploads.dir().to_path_buf();

    Router::new()
        .route("/health", get(system::health))
        .route("/api/metrics", get(system::metrics))
        .route("/api/docs/openapi.json", get(openapi_json))
        .route("/api/auth/login", post(auth_handlers::login))
        .route("/api/auth/refresh", post(auth_handlers::refresh))
        .route("/api/auth/logout", post(auth_handlers::logout))
        .route("/api/personas", get(personas::search).post(personas::create))
        .route("/api/personas/stats", get(personas::stats))
        .route(
            "/api/personas/{id}",
            get(personas::get).put(personas::update).delete(personas::remove),
        )
        .route("/api/registros", get(registros::search).post(registros::create))
        .route(
            "/api/registros/{id}",
            get(registros::get).put(registros::update).delete(registros::remove),
        )
        .route("/api/registros/{id}/duplicate", post(registros::duplicate))
        .route("/api/usuarios", get(usuarios::list).post(usuarios::create))
        .route(
            "/api/usuarios/me/profile",
            get(usuarios::get_profile).put(usuarios::update_profile),
        )
        .route("/api/usuarios/me/password", put(usuarios::change_own_password))
        .route(
            "/api/usuarios/{id}",
            get(usuarios::get).put(usuarios::update).delete(usuarios::remove),
        )
        .route("/api/usuarios/{id}/password", put(usuarios::admin_change_password))
        .route("/api/usuarios/{id}/revoke-tokens", post(usuarios::revoke_tokens))
        .route("/api/audit/recent", get(audit::recent))
        .route("/api/audit/actor/{id}", get(audit::actor_history))
        .route("/api/audit/{entity}/{id}", get(audit::entity_history))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(from_fn_with_state(state.clone(), metrics::track_requests))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Seed the initial admin account when the usuarios table is empty, so a
/// fresh deployment can log in without manual database surgery.
pub async fn bootstrap_admin(pool: &SqlitePool, config: &Config) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    let mut repo = Users::new(&mut conn);

    if repo.count().await? > 0 {
        return Ok(());
    }

    let password_hash = password::hash_password(&config.admin.password, config.auth.argon2)?;
    let id = repo
        .create(&UserCreateDBRequest {
            usuario: config.admin.usuario.clone(),
            nombre: config.admin.nombre.clone(),
            apellido: config.admin.apellido.clone(),
            rol: api::models::users::Role::Admin,
            activo: true,
            password_hash,
            token_version: 0,
            created_by: None,
        })
        .await?;

    tracing::info!(usuario = %config.admin.usuario, id, "seeded initial admin user");
    if config.is_production() && config.admin.password == "admin123" {
        tracing::warn!("initial admin uses the default password; change it immediately");
    }

    Ok(())
}

/// The assembled application: pool, migrations, admin bootstrap, router
/// and a bound listener, ready to serve.
pub struct Application {
    router: Router,
    listener: TcpListener,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::pool::connect(&config.database).await?;
        MIGRATOR.run(&pool).await?;

        let uploads = Arc::new(UploadStore::from_config(&config.uploads));
        uploads.ensure_dir().await?;

        bootstrap_admin(&pool, &config).await?;

        let listener = TcpListener::bind(config.bind_address()).await?;
        tracing::info!(address = %listener.local_addr()?, "listening");

        let state = AppState {
            db: pool,
            config,
            metrics: Arc::new(Metrics::default()),
            uploads,
        };

        Ok(Self {
            router: router(state),
            listener,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the shutdown future completes.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
