use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use super::auth::Session;
use super::cookies::clear_cookie;
use super::flash::FLASH_COOKIE;

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        // Convert data to JSON Value for consistent envelope format
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        // Wrap in success envelope
        let envelope = json!({
            "success": true,
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

/// A rendered page: the template name plus everything it displays.
/// Pending flash messages are shown once and their cookie is cleared.
#[derive(Debug)]
pub struct Page {
    name: &'static str,
    session: Session,
    context: Value,
}

impl Page {
    pub fn new(name: &'static str, session: &Session, context: Value) -> Self {
        Self {
            name,
            session: session.clone(),
            context,
        }
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let user = self.session.user.as_ref().map(|u| {
            json!({
                "username": u.username,
                "is_staff": u.is_staff,
                "is_superuser": u.is_superuser,
            })
        });
        let body = json!({
            "page": self.name,
            "user": user,
            "messages": self.session.messages,
            "context": self.context,
        });

        let mut response = ApiResponse::success(body).into_response();
        if !self.session.messages.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&clear_cookie(FLASH_COOKIE)) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

// Convenience type aliases
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
pub type PageResult = Result<Response, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::flash::{FlashMessage, Level};

    #[test]
    fn page_clears_shown_messages() {
        let session = Session {
            messages: vec![FlashMessage {
                level: Level::Info,
                message: "hi".into(),
            }],
            ..Default::default()
        };
        let response = Page::new("index", &session, json!({})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("dapi_flash=;"));

        let quiet = Page::new("index", &Session::default(), json!({})).into_response();
        assert!(quiet.headers().get(header::SET_COOKIE).is_none());
    }
}
