//! One-shot messages carried across a redirect in the `dapi_flash` cookie.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookies::set_cookie;

pub const FLASH_COOKIE: &str = "dapi_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

pub fn encode(messages: &[FlashMessage]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for m in messages {
        serializer.append_pair(m.level.as_str(), &m.message);
    }
    serializer.finish()
}

pub fn decode(value: &str) -> Vec<FlashMessage> {
    url::form_urlencoded::parse(value.as_bytes())
        .filter_map(|(level, message)| {
            let level = match level.as_ref() {
                "info" => Level::Info,
                "error" => Level::Error,
                _ => return None,
            };
            Some(FlashMessage {
                level,
                message: message.into_owned(),
            })
        })
        .collect()
}

/// 302 redirect, optionally leaving flash messages and extra cookies
#[derive(Debug, Clone)]
pub struct FlashRedirect {
    location: String,
    messages: Vec<FlashMessage>,
    cookies: Vec<String>,
}

impl FlashRedirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            messages: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn info(mut self, message: impl Into<String>) -> Self {
        self.messages.push(FlashMessage {
            level: Level::Info,
            message: message.into(),
        });
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.messages.push(FlashMessage {
            level: Level::Error,
            message: message.into(),
        });
        self
    }

    /// Adds a raw `Set-Cookie` value
    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.cookies.push(cookie);
        self
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let mut response = StatusCode::FOUND.into_response();
        let headers = response.headers_mut();

        match HeaderValue::from_str(&self.location) {
            Ok(location) => {
                headers.insert(header::LOCATION, location);
            }
            Err(_) => {
                tracing::error!("Refusing to redirect to {:?}", self.location);
                headers.insert(header::LOCATION, HeaderValue::from_static("/"));
            }
        }

        let mut cookies = self.cookies;
        if !self.messages.is_empty() {
            cookies.push(set_cookie(FLASH_COOKIE, &encode(&self.messages), None));
        }
        for cookie in cookies {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_survive_the_cookie() {
        let messages = vec![
            FlashMessage {
                level: Level::Info,
                message: "Dap foo successfully deleted.".into(),
            },
            FlashMessage {
                level: Level::Error,
                message: "You don't have permissions; sorry & bye".into(),
            },
        ];
        let encoded = encode(&messages);
        assert!(!encoded.contains(' ') && !encoded.contains(';'));
        assert_eq!(decode(&encoded), messages);
        assert!(decode("bogus=1").is_empty());
    }

    #[test]
    fn redirect_sets_location_and_flash() {
        let response = FlashRedirect::to("/dap/foo/").info("Tags successfully saved.").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/dap/foo/");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("dapi_flash=info=Tags+successfully+saved."));
    }
}
