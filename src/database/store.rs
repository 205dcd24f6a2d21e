//! Storage traits shared by the PostgreSQL and in-memory stores.
//!
//! Operations that touch several rows (ownership transfer, tag and
//! comaintainer replacement, report creation, cascading deletes) are single
//! methods so each implementation can make them atomic.

use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Dap, MetaDap, MetaDapQuery, NewDap, NewReport, NewTag, NewUser, Rank, Report, SocialAuth,
    Tag, User,
};

pub type StoreResult<T> = Result<T, DatabaseError>;

/// Offset/limit window for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Users ordered by id
    async fn list_users(&self, window: Window) -> StoreResult<Vec<User>>;
    async fn count_users(&self) -> StoreResult<i64>;
    /// Fails with Conflict when the username is taken
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    /// Fails with Conflict when the new username is taken
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    /// Cascades to owned daps, ranks, social auths and syncs; reports keep a null reporter
    async fn delete_user(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait SocialRepo: Send + Sync {
    async fn social_auths_of(&self, user_id: i64) -> StoreResult<Vec<SocialAuth>>;
    async fn social_auth_by_uid(&self, provider: &str, uid: &str) -> StoreResult<Option<SocialAuth>>;
    async fn create_social_auth(
        &self,
        user_id: i64,
        provider: &str,
        uid: &str,
        username: &str,
    ) -> StoreResult<SocialAuth>;
    async fn update_social_auth(&self, auth: &SocialAuth) -> StoreResult<()>;
    /// Ids of the social auths that override the profile on login
    async fn profile_syncs(&self, user_id: i64) -> StoreResult<Vec<i64>>;
    async fn set_profile_syncs(&self, user_id: i64, social_auth_ids: &[i64]) -> StoreResult<()>;
}

#[async_trait]
pub trait MetaDapRepo: Send + Sync {
    async fn metadap_by_id(&self, id: i64) -> StoreResult<Option<MetaDap>>;
    async fn metadap_by_name(&self, package_name: &str) -> StoreResult<Option<MetaDap>>;
    async fn list_metadaps(&self, query: &MetaDapQuery) -> StoreResult<Vec<MetaDap>>;
    /// Ignores the query window
    async fn count_metadaps(&self, query: &MetaDapQuery) -> StoreResult<i64>;
    /// Fails with Conflict when the name is taken
    async fn create_metadap(&self, package_name: &str, owner_id: i64) -> StoreResult<MetaDap>;
    /// Persists active flag and latest pointers
    async fn update_metadap(&self, metadap: &MetaDap) -> StoreResult<()>;
    /// Cascades to daps, reports, ranks, comaintainer and tag links
    async fn delete_metadap(&self, id: i64) -> StoreResult<()>;
    async fn owned_by(&self, user_id: i64) -> StoreResult<Vec<MetaDap>>;
    async fn comaintained_by(&self, user_id: i64) -> StoreResult<Vec<MetaDap>>;
    /// Comaintainers ordered by username
    async fn comaintainers(&self, metadap_id: i64) -> StoreResult<Vec<User>>;
    /// Replaces the whole comaintainer set; the owner is never stored in it
    async fn set_comaintainers(&self, metadap_id: i64, user_ids: &[i64]) -> StoreResult<()>;
    async fn remove_comaintainer(&self, metadap_id: i64, user_id: i64) -> StoreResult<()>;
    /// Makes `new_owner_id` the owner, adds the previous owner to the
    /// comaintainers and removes the new owner from them, atomically
    async fn transfer_ownership(&self, metadap_id: i64, new_owner_id: i64) -> StoreResult<MetaDap>;
    /// Active daps sharing tags with the given one, most shared tags first
    async fn similar_active(&self, metadap_id: i64, limit: i64) -> StoreResult<Vec<MetaDap>>;
}

#[async_trait]
pub trait TagRepo: Send + Sync {
    async fn tag_by_slug(&self, slug: &str) -> StoreResult<Option<Tag>>;
    /// Tags ordered by name
    async fn tags_of(&self, metadap_id: i64) -> StoreResult<Vec<Tag>>;
    /// Replaces the tag set, creating unknown tags by slug
    async fn set_tags(&self, metadap_id: i64, tags: &[NewTag]) -> StoreResult<()>;
}

#[async_trait]
pub trait DapRepo: Send + Sync {
    async fn dap_by_id(&self, id: i64) -> StoreResult<Option<Dap>>;
    async fn dap_by_version(&self, metadap_id: i64, version: &str) -> StoreResult<Option<Dap>>;
    /// Daps of one metadap ordered by id
    async fn daps_of(&self, metadap_id: i64) -> StoreResult<Vec<Dap>>;
    async fn list_daps(&self, window: Window) -> StoreResult<Vec<Dap>>;
    async fn count_daps(&self) -> StoreResult<i64>;
    /// Fails with Conflict when the version exists
    async fn create_dap(&self, new: NewDap) -> StoreResult<Dap>;
    /// Clears latest pointers that referenced the dap
    async fn delete_dap(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn report_by_id(&self, id: i64) -> StoreResult<Option<Report>>;
    /// Unsolved first, then by id
    async fn reports_of(&self, metadap_id: i64, include_solved: bool) -> StoreResult<Vec<Report>>;
    async fn unsolved_report_count(&self, metadap_id: i64) -> StoreResult<i64>;
    async fn create_report(&self, new: NewReport) -> StoreResult<Report>;
    async fn set_report_solved(&self, id: i64, solved: bool) -> StoreResult<()>;
}

#[async_trait]
pub trait RankRepo: Send + Sync {
    async fn rank_of(&self, user_id: i64, metadap_id: i64) -> StoreResult<Option<Rank>>;
    /// Inserts or updates in place
    async fn upsert_rank(&self, user_id: i64, metadap_id: i64, rank: i32) -> StoreResult<Rank>;
    /// Returns whether a row was removed
    async fn delete_rank(&self, user_id: i64, metadap_id: i64) -> StoreResult<bool>;
    /// Recomputes rank_count and average_rank of the metadap
    async fn refresh_rank_stats(&self, metadap_id: i64) -> StoreResult<MetaDap>;
}

/// Combined store used by the application
#[async_trait]
pub trait Store:
    UserRepo + SocialRepo + MetaDapRepo + TagRepo + DapRepo + ReportRepo + RankRepo + Send + Sync
{
    async fn migrate(&self) -> StoreResult<()>;
    async fn health_check(&self) -> StoreResult<()>;
}
