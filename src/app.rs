use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::captcha::CaptchaGuard;
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers;
use crate::mail::Mailer;
use crate::middleware::session_middleware;
use crate::storage::MediaStorage;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub media: MediaStorage,
    pub captchas: CaptchaGuard,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: AppConfig) -> Self {
        Self {
            media: MediaStorage::new(config.storage.media_dir.clone()),
            captchas: CaptchaGuard::new(),
            store,
            mailer,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.api.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        // Anyone
        .merge(public_routes())
        .merge(api_routes())
        // Signed-in users
        .merge(protected_routes())
        // Staff
        .merge(elevated_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(from_fn_with_state(state.clone(), session_middleware)),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{account, browse, dap, report};

    Router::new()
        .route("/", get(browse::index))
        .route("/tag/:tag/", get(browse::tag))
        .route("/dap/:dap/", get(dap::dap))
        .route("/dap/:dap/devel/", get(dap::devel))
        .route("/dap/:dap/stable/", get(dap::stable))
        .route("/dap/:dap/reports/", get(report::reports))
        .route("/dap/:dap/report/", get(report::report_get).post(report::report_post))
        .route("/dap/:dap/:version/", get(dap::version))
        .route("/dap/:dap/:version/download/", get(dap::download))
        .route("/user/:user/", get(account::user))
        .route("/login/", get(account::login))
        .route("/login/complete/", post(account::login_complete))
}

fn api_routes() -> Router<AppState> {
    use handlers::public::api;

    Router::new()
        .route("/api/users/", get(api::users))
        .route("/api/users/:id/", get(api::user))
        .route("/api/metadaps/", get(api::metadaps))
        .route("/api/metadaps/:id/", get(api::metadap))
        .route("/api/daps/", get(api::daps))
        .route("/api/daps/:id/", get(api::dap))
}

fn protected_routes() -> Router<AppState> {
    use handlers::protected::{account, admin, maintain, rank, upload};

    Router::new()
        .route("/upload/", get(upload::upload_get).post(upload::upload_post))
        .route("/dap/:dap/admin/", get(admin::admin_get).post(admin::admin_post))
        .route("/dap/:dap/leave/", get(admin::leave_get).post(admin::leave_post))
        .route("/dap/:dap/tags/", get(maintain::tags_get).post(maintain::tags_post))
        .route(
            "/dap/:dap/:version/delete/",
            get(maintain::delete_version_get).post(maintain::delete_version_post),
        )
        .route("/dap/:dap/rank/:rank/", post(rank::rank))
        .route("/user/:user/edit/", get(account::edit_get).post(account::edit_post))
        .route("/logout/", post(account::logout))
}

fn elevated_routes() -> Router<AppState> {
    use handlers::elevated::reports;

    Router::new().route("/report/:report_id/toggle-solve/", post(reports::toggle_solve))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
