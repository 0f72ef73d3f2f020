use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AttendanceService, AuthService, MailComposer, Mailer, SeaOrmAttendanceService,
    SeaOrmAuthService, mail,
};

pub mod auth;
pub mod calendar;
mod error;
pub mod flash;
pub mod forms;
mod observability;
mod public;
pub mod reports;
mod types;
mod validation;

pub use error::{ApiError, JsonError};
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub attendance_service: Arc<dyn AttendanceService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// Wires the services over an opened store with the given mailer.
pub async fn create_app_state(
    config: Config,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let composer = MailComposer::new(&config.server.public_url)?;

    let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        mailer,
        composer,
        config.security.clone(),
    ));

    let attendance_service: Arc<dyn AttendanceService> = Arc::new(SeaOrmAttendanceService::new(
        store.clone(),
        &config.attendance,
    )?);

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        auth_service,
        attendance_service,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let mailer = mail::build_mailer(&config.mail)?;
    create_app_state(config, mailer, prometheus_handle).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )));

    Router::new()
        .merge(create_protected_router(state.clone()))
        .merge(create_reset_router(state.clone()))
        .route("/", get(public::index))
        .route("/health", get(public::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/static/table.js", get(reports::table_script))
        .route("/activate", get(auth::activate))
        .route(
            "/forgot_password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .layer(session_layer)
        .with_state(state)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", get(auth::logout))
        .route(
            "/resend_activation_email",
            get(auth::resend_activation_email),
        )
        .route("/account", get(auth::account_page).post(auth::account))
        .route("/vypisy", get(reports::vypisy))
        .route("/mesicni_vypis/{month}", get(reports::mesicni_vypis))
        .route("/tbl_isdata/{from}/{to}", get(reports::tbl_isdata))
        .route("/tabletest", get(reports::tabletest))
        .route(
            "/caljsonr/{card_number}/{year}/{month}",
            get(calendar::caljsonr),
        )
        .route(
            "/calendar/{card_number}/{year}/{month}",
            get(calendar::calendar),
        )
        .route(
            "/calendar_edit/{card_number}/{year}/{month}/{day}",
            get(calendar::calendar_edit_page).post(calendar::calendar_edit),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::require_login))
}

fn create_reset_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/reset_password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::reset_token_required,
        ))
}
