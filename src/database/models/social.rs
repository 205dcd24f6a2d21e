use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A login identity at an external provider, linked to a local user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SocialAuth {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub uid: String,
    /// Username at the provider
    pub username: String,
}
