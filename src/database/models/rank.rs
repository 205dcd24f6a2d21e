use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Rank {
    pub id: i64,
    pub user_id: i64,
    pub metadap_id: i64,
    pub rank: i32,
}
