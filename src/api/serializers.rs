//! Hyperlinked JSON resources. Relations are rendered as absolute URLs of
//! the related resources.

use serde::Serialize;

use crate::config::AppConfig;
use crate::database::models::{Dap, MetaDap, SocialAuth, User};
use crate::database::{Store, StoreResult};

#[derive(Debug, Clone, Serialize)]
pub struct UserResource {
    pub url: String,
    pub id: i64,
    pub username: String,
    pub metadap_set: Vec<String>,
    pub codap_set: Vec<String>,
    pub fedora_username: Option<String>,
    pub github_username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaDapResource {
    pub url: String,
    pub id: i64,
    pub package_name: String,
    pub user: String,
    pub active: bool,
    pub rank_count: i32,
    pub average_rank: f64,
    pub latest: Option<String>,
    pub latest_stable: Option<String>,
    /// Unsolved reports
    pub reports: i64,
    pub dap_set: Vec<String>,
    pub comaintainers: Vec<String>,
    pub tags: Vec<String>,
    pub similar_daps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DapResource {
    pub url: String,
    pub id: i64,
    pub metadap: String,
    pub package_name: String,
    pub version: String,
    pub license: String,
    pub summary: String,
    pub description: String,
    pub authors: Vec<String>,
    pub homepage: String,
    pub bugreports: String,
    pub is_pre: bool,
    pub is_latest: bool,
    pub is_latest_stable: bool,
    pub reports: i64,
}

pub fn user_url(config: &AppConfig, id: i64) -> String {
    config.absolute_url(&format!("/api/users/{}/", id))
}

pub fn metadap_url(config: &AppConfig, id: i64) -> String {
    config.absolute_url(&format!("/api/metadaps/{}/", id))
}

pub fn dap_url(config: &AppConfig, id: i64) -> String {
    config.absolute_url(&format!("/api/daps/{}/", id))
}

/// Username at the given login provider
pub fn provider_username(auths: &[SocialAuth], provider: &str) -> Option<String> {
    auths
        .iter()
        .find(|a| a.provider == provider)
        .map(|a| a.username.clone())
}

pub async fn user_resource(
    store: &dyn Store,
    config: &AppConfig,
    user: &User,
) -> StoreResult<UserResource> {
    let owned = store.owned_by(user.id).await?;
    let comaintained = store.comaintained_by(user.id).await?;
    let auths = store.social_auths_of(user.id).await?;

    Ok(UserResource {
        url: user_url(config, user.id),
        id: user.id,
        username: user.username.clone(),
        metadap_set: owned.iter().map(|m| metadap_url(config, m.id)).collect(),
        codap_set: comaintained.iter().map(|m| metadap_url(config, m.id)).collect(),
        fedora_username: provider_username(&auths, "fedora"),
        github_username: provider_username(&auths, "github"),
    })
}

pub async fn metadap_resource(
    store: &dyn Store,
    config: &AppConfig,
    metadap: &MetaDap,
) -> StoreResult<MetaDapResource> {
    let daps = store.daps_of(metadap.id).await?;
    let comaintainers = store.comaintainers(metadap.id).await?;
    let tags = store.tags_of(metadap.id).await?;
    let similar = store.similar_active(metadap.id, i64::MAX).await?;
    let reports = store.unsolved_report_count(metadap.id).await?;

    Ok(MetaDapResource {
        url: metadap_url(config, metadap.id),
        id: metadap.id,
        package_name: metadap.package_name.clone(),
        user: user_url(config, metadap.user_id),
        active: metadap.active,
        rank_count: metadap.rank_count,
        average_rank: metadap.average_rank,
        latest: metadap.latest_id.map(|id| dap_url(config, id)),
        latest_stable: metadap.latest_stable_id.map(|id| dap_url(config, id)),
        reports,
        dap_set: daps.iter().map(|d| dap_url(config, d.id)).collect(),
        comaintainers: comaintainers.iter().map(|u| user_url(config, u.id)).collect(),
        tags: tags.into_iter().map(|t| t.name).collect(),
        similar_daps: similar.into_iter().map(|m| m.package_name).collect(),
    })
}

pub async fn dap_resource(store: &dyn Store, config: &AppConfig, dap: &Dap) -> StoreResult<DapResource> {
    let metadap = store
        .metadap_by_id(dap.metadap_id)
        .await?
        .ok_or_else(|| crate::database::DatabaseError::NotFound(format!("dap {}", dap.metadap_id)))?;
    let reports = store.unsolved_report_count(metadap.id).await?;
    Ok(dap_resource_of(config, &metadap, dap, reports))
}

/// Dap resource when the package is already loaded
pub fn dap_resource_of(config: &AppConfig, metadap: &MetaDap, dap: &Dap, reports: i64) -> DapResource {
    DapResource {
        url: dap_url(config, dap.id),
        id: dap.id,
        metadap: metadap_url(config, metadap.id),
        package_name: metadap.package_name.clone(),
        version: dap.version.clone(),
        license: dap.license.clone(),
        summary: dap.summary.clone(),
        description: dap.description.clone(),
        authors: dap.authors.clone(),
        homepage: dap.homepage.clone(),
        bugreports: dap.bugreports.clone(),
        is_pre: dap.is_pre(),
        is_latest: metadap.latest_id == Some(dap.id),
        is_latest_stable: metadap.latest_stable_id == Some(dap.id),
        reports,
    }
}
