use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Absolute origin used for hyperlinks in the API and in mails
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub page_size: usize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub session_secret: String,
    pub session_expiry_hours: u64,
    /// Shared secret of the upstream identity provider calling /login/complete/
    pub login_secret: String,
    pub login_backends: Vec<String>,
    pub captcha_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub enabled: bool,
    pub from: String,
    pub admins: Vec<String>,
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub media_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("DAPI_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("DAPI_BASE_URL") {
            self.server.base_url = v.trim_end_matches('/').to_string();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_PAGE_SIZE") {
            self.api.page_size = v.parse().unwrap_or(self.api.page_size);
        }
        if let Ok(v) = env::var("API_MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.security.session_secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.security.session_expiry_hours = v.parse().unwrap_or(self.security.session_expiry_hours);
        }
        if let Ok(v) = env::var("LOGIN_SECRET") {
            self.security.login_secret = v;
        }
        if let Ok(v) = env::var("LOGIN_BACKENDS") {
            self.security.login_backends = split_list(&v);
        }
        if let Ok(v) = env::var("CAPTCHA_SECRET") {
            self.security.captcha_secret = v;
        }

        // Mail overrides
        if let Ok(v) = env::var("MAIL_ENABLED") {
            self.mail.enabled = v.parse().unwrap_or(self.mail.enabled);
        }
        if let Ok(v) = env::var("MAIL_FROM") {
            self.mail.from = v;
        }
        if let Ok(v) = env::var("MAIL_ADMINS") {
            self.mail.admins = split_list(&v);
        }
        if let Ok(v) = env::var("MAIL_RELAY_URL") {
            self.mail.relay_url = Some(v);
        }

        if let Ok(v) = env::var("MEDIA_DIR") {
            self.storage.media_dir = PathBuf::from(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8000,
                base_url: "http://localhost:8000".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                page_size: 25,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                session_secret: "development-session-secret".to_string(),
                session_expiry_hours: 24 * 7, // 1 week
                login_secret: "development-login-secret".to_string(),
                login_backends: vec!["github".to_string(), "fedora".to_string()],
                captcha_secret: "development-captcha-secret".to_string(),
            },
            mail: MailConfig {
                enabled: false,
                from: "no-reply@localhost".to_string(),
                admins: Vec::new(),
                relay_url: None,
            },
            storage: StorageConfig {
                media_dir: PathBuf::from("media"),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8000,
                base_url: "https://dapi-staging.example.com".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            api: ApiConfig {
                page_size: 25,
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
            },
            // Secrets have no defaults outside development
            security: SecurityConfig {
                session_secret: String::new(),
                session_expiry_hours: 24,
                login_secret: String::new(),
                login_backends: vec!["github".to_string(), "fedora".to_string()],
                captcha_secret: String::new(),
            },
            mail: MailConfig {
                enabled: true,
                from: "no-reply@example.com".to_string(),
                admins: Vec::new(),
                relay_url: None,
            },
            storage: StorageConfig {
                media_dir: PathBuf::from("/var/lib/dapi/media"),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8000,
                base_url: "https://dapi.example.com".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                page_size: 25,
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                session_secret: String::new(),
                session_expiry_hours: 24 * 14,
                login_secret: String::new(),
                login_backends: vec!["github".to_string(), "fedora".to_string()],
                captcha_secret: String::new(),
            },
            mail: MailConfig {
                enabled: true,
                from: "no-reply@example.com".to_string(),
                admins: Vec::new(),
                relay_url: None,
            },
            storage: StorageConfig {
                media_dir: PathBuf::from("/var/lib/dapi/media"),
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Absolute URL for a site-relative path
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.server.base_url.trim_end_matches('/'), path)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.is_development());
        assert!(!config.mail.enabled);
        assert_eq!(config.api.page_size, 25);
        assert!(!config.security.session_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.is_development());
        assert!(config.mail.enabled);
        assert!(config.security.session_secret.is_empty());
    }

    #[test]
    fn absolute_url_joins_base() {
        let mut config = AppConfig::development();
        config.server.base_url = "https://dapi.test/".to_string();
        assert_eq!(config.absolute_url("/dap/foo/"), "https://dapi.test/dap/foo/");
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list("a@x.org, ,b@y.org"), vec!["a@x.org", "b@y.org"]);
    }
}
