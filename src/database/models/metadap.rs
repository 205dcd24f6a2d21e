use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MetaDap {
    pub id: i64,
    pub package_name: String,
    /// Owner
    pub user_id: i64,
    pub active: bool,
    pub latest_id: Option<i64>,
    pub latest_stable_id: Option<i64>,
    pub average_rank: f64,
    pub rank_count: i32,
}

impl MetaDap {
    pub fn is_owner(&self, user: &User) -> bool {
        self.user_id == user.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaDapOrder {
    /// -average_rank, -rank_count
    TopRated,
    /// -rank_count, -average_rank
    MostRated,
    #[default]
    Id,
}

#[derive(Debug, Clone, Default)]
pub struct MetaDapQuery {
    pub active: Option<bool>,
    pub tag_slug: Option<String>,
    pub order: MetaDapOrder,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl MetaDapQuery {
    pub fn active() -> Self {
        Self {
            active: Some(true),
            ..Default::default()
        }
    }

    pub fn tagged(mut self, slug: impl Into<String>) -> Self {
        self.tag_slug = Some(slug.into());
        self
    }

    pub fn ordered(mut self, order: MetaDapOrder) -> Self {
        self.order = order;
        self
    }

    pub fn window(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}
