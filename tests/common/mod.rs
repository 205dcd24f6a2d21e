#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use flate2::{write::GzEncoder, Compression};
use reqwest::{header, redirect::Policy, Client, Response};
use serde_json::{json, Value};

use dapi::app::{router, AppState};
use dapi::config::AppConfig;
use dapi::database::models::User;
use dapi::database::{MemoryStore, UserRepo};
use dapi::mail::MemoryMailer;
use dapi::middleware::flash::{decode, FLASH_COOKIE};

pub const LOGIN_SECRET: &str = "test-login-secret";

/// One application instance per test, backed by memory
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub media_dir: PathBuf,
    pub client: Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns with test defaults adjusted by `configure`
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let media_dir = std::env::temp_dir().join(format!("dapi-test-{}", uuid::Uuid::new_v4()));

        let mut config = AppConfig::development();
        config.server.base_url = base_url.clone();
        config.storage.media_dir = media_dir.clone();
        config.security.login_secret = LOGIN_SECRET.to_string();
        config.mail.enabled = true;
        config.mail.admins = vec!["admin@example.com".to_string()];
        configure(&mut config);

        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let app = router(AppState::new(store.clone(), mailer.clone(), config));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        // Redirects are asserted on, never followed
        let client = Client::builder().redirect(Policy::none()).build()?;

        Ok(Self {
            base_url,
            store,
            mailer,
            media_dir,
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Completes a github login and returns the session token
    pub async fn login(&self, username: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/login/complete/"))
            .header("X-Login-Secret", LOGIN_SECRET)
            .json(&json!({
                "provider": "github",
                "uid": format!("gh-{}", username),
                "username": username,
                "email": format!("{}@example.com", username),
                "first_name": username,
                "last_name": "Tester",
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == 302, "login failed with {}", res.status());
        cookie(&res, "dapi_session").context("no session cookie")
    }

    pub async fn user(&self, username: &str) -> Result<User> {
        self.store
            .user_by_username(username)
            .await?
            .with_context(|| format!("no user {}", username))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    pub async fn post_form(&self, path: &str, token: Option<&str>, form: &[(&str, &str)]) -> Result<Response> {
        let mut req = self.client.post(self.url(path)).form(form);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    /// Uploads a dap archive and returns the response
    pub async fn upload(&self, token: &str, filename: &str, bytes: Vec<u8>) -> Result<Response> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        Ok(self
            .client
            .post(self.url("/upload/"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_dir);
    }
}

/// Value of a cookie set by the response
pub fn cookie(res: &Response, name: &str) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Flash messages left by a redirect
pub fn flash(res: &Response) -> Vec<String> {
    cookie(res, FLASH_COOKIE)
        .map(|value| decode(&value).into_iter().map(|m| m.message).collect())
        .unwrap_or_default()
}

pub fn location(res: &Response) -> Option<String> {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The `data` of a successful envelope
pub async fn data(res: Response) -> Result<Value> {
    let body: Value = res.json().await?;
    anyhow::ensure!(body["success"] == true, "unexpected body {}", body);
    Ok(body["data"].clone())
}

/// A valid `.dap` archive for the given name and version
pub fn dap_archive(name: &str, version: &str) -> (String, Vec<u8>) {
    let top = format!("{}-{}", name, version);
    let meta = format!(
        "package_name: {}\nversion: '{}'\nlicense: GPLv2+\nauthors: [Tester <tester@example.com>]\nsummary: {} assistant\n",
        name, version, name
    );
    let bytes = archive_with_meta(&top, &meta);
    (format!("{}.dap", top), bytes)
}

/// A `.dap` tarball holding only `<top>/meta.yaml`
pub fn archive_with_meta(top: &str, meta: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(meta.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{}/meta.yaml", top), meta.as_bytes())
        .expect("append meta.yaml");
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .expect("finish archive")
}
