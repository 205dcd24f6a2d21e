use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::auth::{verify_session, SESSION_COOKIE};
use crate::database::models::User;
use crate::error::ApiError;

use super::cookies::get_cookie;
use super::flash::{decode, FlashMessage, FLASH_COOKIE};

/// Per-request visitor context: the signed-in user (if any), pending flash
/// messages and the requested path
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub user: Option<User>,
    pub messages: Vec<FlashMessage>,
    /// Path and query, used as `next` after logging in
    pub path: String,
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The signed-in user, or a redirect to the login page
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user
            .as_ref()
            .ok_or_else(|| ApiError::login_required(self.path.clone()))
    }

    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_staff)
    }
}

/// Resolves the session token and flash cookie into a [`Session`]
/// extension. Invalid or expired tokens make an anonymous session.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let messages = get_cookie(headers, FLASH_COOKIE)
        .map(|value| decode(&value))
        .unwrap_or_default();

    let user = match extract_token(headers) {
        None => None,
        Some(token) => match verify_session(&state.config.security, &token) {
            Ok(claims) => match state.store.user_by_id(claims.sub).await {
                Ok(user) => user,
                Err(e) => return ApiError::from(e).into_response(),
            },
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                None
            }
        },
    };

    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    request.extensions_mut().insert(Session {
        user,
        messages,
        path,
    });

    next.run(request).await
}

/// Session token from the Authorization header, else from the cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    bearer.or_else(|| get_cookie(headers, SESSION_COOKIE).filter(|token| !token.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("dapi_session=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn anonymous_session_requires_login() {
        let session = Session {
            path: "/upload/".into(),
            ..Default::default()
        };
        assert!(matches!(
            session.require_user(),
            Err(ApiError::LoginRequired { next }) if next == "/upload/"
        ));
        assert!(!session.is_staff());
    }
}
