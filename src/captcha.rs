//! Arithmetic captcha.
//!
//! The key handed to the client is `<salt>:<sha256(secret:salt:answer)>` with
//! `<salt>` = `<issued unix time>.<nonce>`. Keys expire after
//! [`CAPTCHA_TTL_SECS`] and [`CaptchaGuard`] accepts each one once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::secrets_match;

pub const CAPTCHA_TTL_SECS: i64 = 10 * 60;

/// Upper bound of redeemed keys kept until they expire
const MAX_REDEEMED: usize = 10_000;

/// Tolerated clock skew for keys issued by another instance
const MAX_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captcha {
    pub question: String,
    pub key: String,
}

fn digest(secret: &str, salt: &str, answer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(answer.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// A new "a + b" challenge with operands in 1..=9
pub fn challenge(secret: &str) -> Captcha {
    challenge_at(secret, Utc::now().timestamp())
}

fn challenge_at(secret: &str, issued: i64) -> Captcha {
    let salt = format!("{}.{}", issued, Uuid::new_v4().simple());
    let bytes = Uuid::new_v4();
    let bytes = bytes.as_bytes();
    let (a, b) = (u32::from(bytes[0] % 9) + 1, u32::from(bytes[1] % 9) + 1);
    let answer = (a + b).to_string();
    Captcha {
        question: format!("{} + {} =", a, b),
        key: format!("{}:{}", salt, digest(secret, &salt, &answer)),
    }
}

/// Issue time encoded in the salt
fn issued_at(salt: &str) -> Option<i64> {
    let (issued, nonce) = salt.split_once('.')?;
    if nonce.is_empty() {
        return None;
    }
    issued.parse().ok()
}

/// Checks the answer and the age of the key without consuming it
pub fn verify(secret: &str, key: &str, answer: &str) -> bool {
    verify_at(secret, key, answer, Utc::now().timestamp())
}

fn verify_at(secret: &str, key: &str, answer: &str, now: i64) -> bool {
    let Some((salt, expected)) = key.split_once(':') else {
        return false;
    };
    let Some(issued) = issued_at(salt) else {
        return false;
    };
    if now - issued > CAPTCHA_TTL_SECS || issued - now > MAX_SKEW_SECS {
        return false;
    }
    secrets_match(&digest(secret, salt, answer.trim()), expected)
}

/// Remembers redeemed keys until they expire
#[derive(Debug, Clone, Default)]
pub struct CaptchaGuard {
    // salt -> issue time
    redeemed: Arc<Mutex<HashMap<String, i64>>>,
}

impl CaptchaGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies the answer and consumes the key. Replays fail.
    pub fn redeem(&self, secret: &str, key: &str, answer: &str) -> bool {
        self.redeem_at(secret, key, answer, Utc::now().timestamp())
    }

    fn redeem_at(&self, secret: &str, key: &str, answer: &str, now: i64) -> bool {
        if !verify_at(secret, key, answer, now) {
            return false;
        }
        let Some((salt, issued)) = key
            .split_once(':')
            .and_then(|(salt, _)| issued_at(salt).map(|issued| (salt, issued)))
        else {
            return false;
        };

        let mut redeemed = self.redeemed.lock().unwrap_or_else(PoisonError::into_inner);
        redeemed.retain(|_, at| now - *at <= CAPTCHA_TTL_SECS);
        if redeemed.len() >= MAX_REDEEMED {
            tracing::warn!("Refusing captcha, {} keys redeemed in the last window", redeemed.len());
            return false;
        }
        if redeemed.insert(salt.to_string(), issued).is_some() {
            tracing::warn!("Replayed captcha key {}", salt);
            return false;
        }
        true
    }
}
