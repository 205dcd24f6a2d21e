pub mod api;
pub mod app;
pub mod auth;
pub mod captcha;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod package;
pub mod services;
pub mod storage;

pub use app::{router, AppState};
