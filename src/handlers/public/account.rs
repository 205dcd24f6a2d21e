use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::auth::{issue_session, secrets_match, SESSION_COOKIE};
use crate::error::ApiError;
use crate::handlers::utils::{find_user, metadap_summary};
use crate::middleware::cookies::set_cookie;
use crate::middleware::{FlashRedirect, Page, PageResult, Session};
use crate::services::accounts::safe_next;
use crate::services::{complete_login, LoginError, LoginIdentity};

/// Header carrying the shared secret of the upstream login provider
pub const LOGIN_SECRET_HEADER: &str = "x-login-secret";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// GET /user/:user/ - Profile with owned and comaintained daps
pub async fn user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
) -> PageResult {
    let store = state.store.as_ref();
    let user = find_user(store, &username).await?;
    let owned = store.owned_by(user.id).await?;
    let comaintained = store.comaintained_by(user.id).await?;
    let auths = store.social_auths_of(user.id).await?;
    let can_edit = session
        .user()
        .is_some_and(|me| me.id == user.id || me.is_superuser);

    let context = json!({
        "user": {
            "username": user.username,
            "full_name": user.full_name(),
            "date_joined": user.date_joined,
            "accounts": auths
                .iter()
                .map(|a| json!({ "provider": a.provider, "username": a.username }))
                .collect::<Vec<_>>(),
        },
        "owned": owned.iter().map(metadap_summary).collect::<Vec<_>>(),
        "comaintained": comaintained.iter().map(metadap_summary).collect::<Vec<_>>(),
        "can_edit": can_edit,
    });
    Ok(Page::new("user", &session, context).into_response())
}

/// GET /login/ - Login backends; signed-in users go home
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<LoginQuery>,
) -> PageResult {
    if session.user().is_some() {
        return Ok(FlashRedirect::to("/").into_response());
    }
    let context = json!({
        "next": query.next.unwrap_or_default(),
        "backends": state.config.security.login_backends,
    });
    Ok(Page::new("login", &session, context).into_response())
}

/// POST /login/complete/ - Upstream provider hands over an authenticated
/// identity; the visitor gets a session cookie
pub async fn login_complete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Json(identity): Json<LoginIdentity>,
) -> PageResult {
    let security = &state.config.security;
    let presented = headers
        .get(LOGIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if security.login_secret.is_empty() || !secrets_match(presented, &security.login_secret) {
        tracing::warn!("Rejected login completion for {} account {}", identity.provider, identity.uid);
        return Err(ApiError::unauthorized("Invalid login secret"));
    }

    let user = match complete_login(state.store.as_ref(), session.user(), &identity).await {
        Ok(user) => user,
        Err(LoginError::IncompleteIdentity) => {
            return Err(ApiError::bad_request("provider and uid are required"))
        }
        Err(e @ LoginError::AlreadyAssociated(_)) => {
            return Ok(FlashRedirect::to("/login/").error(e.to_string()).into_response())
        }
        Err(LoginError::Database(e)) => return Err(e.into()),
    };

    let token = issue_session(security, &user).map_err(|e| {
        tracing::error!("Could not issue a session for {}: {}", user.username, e);
        ApiError::internal_server_error("Could not start the session")
    })?;
    tracing::info!("{} logged in with {}", user.username, identity.provider);

    let max_age = security.session_expiry_hours * 3600;
    Ok(FlashRedirect::to(safe_next(identity.next.as_deref()))
        .with_cookie(set_cookie(SESSION_COOKIE, &token, Some(max_age)))
        .into_response())
}
