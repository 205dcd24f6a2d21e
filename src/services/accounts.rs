//! Completing social logins.
//!
//! The identity provider authenticates the person and hands over the
//! identity; this module maps it to a local user.

use serde::Deserialize;

use crate::database::models::{NewUser, SocialAuth, User};
use crate::database::{DatabaseError, Store};

const USERNAME_MAX: usize = 30;

/// Identity asserted by the upstream login provider
#[derive(Debug, Clone, Deserialize)]
pub struct LoginIdentity {
    pub provider: String,
    pub uid: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("provider and uid are required")]
    IncompleteIdentity,
    #[error("This {0} account is already in use.")]
    AlreadyAssociated(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// First free username derived from the provider's username
pub async fn unique_username(store: &dyn Store, wanted: &str) -> Result<String, DatabaseError> {
    let mut base: String = wanted
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
        .take(USERNAME_MAX)
        .collect();
    if base.is_empty() {
        base = "user".to_string();
    }

    if store.user_by_username(&base).await?.is_none() {
        return Ok(base);
    }
    let mut n: u64 = 1;
    loop {
        let suffix = n.to_string();
        let keep = USERNAME_MAX.saturating_sub(suffix.len());
        let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
        if store.user_by_username(&candidate).await?.is_none() {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Finds, associates or creates the user behind a social identity.
/// Identities in the user's sync set overwrite e-mail and names.
pub async fn complete_login(
    store: &dyn Store,
    current: Option<&User>,
    identity: &LoginIdentity,
) -> Result<User, LoginError> {
    if identity.provider.trim().is_empty() || identity.uid.trim().is_empty() {
        return Err(LoginError::IncompleteIdentity);
    }

    let (mut user, auth) = match store
        .social_auth_by_uid(&identity.provider, &identity.uid)
        .await?
    {
        Some(auth) => {
            if let Some(current) = current.filter(|c| c.id != auth.user_id) {
                tracing::warn!(
                    "{} tried to associate {} account {} owned by user {}",
                    current.username,
                    identity.provider,
                    identity.uid,
                    auth.user_id
                );
                return Err(LoginError::AlreadyAssociated(identity.provider.clone()));
            }
            let user = store
                .user_by_id(auth.user_id)
                .await?
                .ok_or_else(|| DatabaseError::NotFound(format!("user {}", auth.user_id)))?;
            let auth = refresh_provider_username(store, auth, &identity.username).await?;
            (user, auth)
        }
        None => match current {
            Some(current) => {
                let auth = store
                    .create_social_auth(current.id, &identity.provider, &identity.uid, &identity.username)
                    .await?;
                tracing::info!("Associated {} account with {}", identity.provider, current.username);
                (current.clone(), auth)
            }
            None => {
                let username = unique_username(store, &identity.username).await?;
                let user = store
                    .create_user(NewUser {
                        email: identity.email.clone(),
                        first_name: identity.first_name.clone(),
                        last_name: identity.last_name.clone(),
                        ..NewUser::named(username)
                    })
                    .await?;
                let auth = store
                    .create_social_auth(user.id, &identity.provider, &identity.uid, &identity.username)
                    .await?;
                store.set_profile_syncs(user.id, &[auth.id]).await?;
                tracing::info!("Created user {} from {} login", user.username, identity.provider);
                (user, auth)
            }
        },
    };

    if store.profile_syncs(user.id).await?.contains(&auth.id) {
        let synced = User {
            email: identity.email.clone(),
            first_name: truncate(&identity.first_name),
            last_name: truncate(&identity.last_name),
            ..user.clone()
        };
        if synced != user {
            store.update_user(&synced).await?;
            user = synced;
        }
    }
    Ok(user)
}

fn truncate(value: &str) -> String {
    value.chars().take(USERNAME_MAX).collect()
}

async fn refresh_provider_username(
    store: &dyn Store,
    mut auth: SocialAuth,
    username: &str,
) -> Result<SocialAuth, DatabaseError> {
    if !username.is_empty() && auth.username != username {
        auth.username = username.to_string();
        store.update_social_auth(&auth).await?;
    }
    Ok(auth)
}

/// `next` target after login; only site-relative paths are followed
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}
