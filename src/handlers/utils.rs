use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Dap, MetaDap, User};
use crate::database::Store;
use crate::error::ApiError;
use crate::forms::FormData;
use crate::middleware::Session;
use crate::services::{can_administrate, can_maintain, get_rank};

/// Similar daps shown on a dap page
pub const SIMILAR_ON_PAGE: i64 = 5;

pub fn dap_path(package_name: &str) -> String {
    format!("/dap/{}/", package_name)
}

pub fn version_path(package_name: &str, version: &str) -> String {
    format!("/dap/{}/{}/", package_name, version)
}

pub fn user_path(username: &str) -> String {
    format!("/user/{}/", username)
}

pub fn form_data(pairs: Vec<(String, String)>) -> FormData {
    FormData::new(pairs)
}

pub async fn find_metadap(store: &dyn Store, package_name: &str) -> Result<MetaDap, ApiError> {
    store
        .metadap_by_name(package_name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Dap {} not found", package_name)))
}

pub async fn find_version(store: &dyn Store, metadap: &MetaDap, version: &str) -> Result<Dap, ApiError> {
    store
        .dap_by_version(metadap.id, version)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Version {} of dap {} not found",
                version, metadap.package_name
            ))
        })
}

pub async fn find_dap(store: &dyn Store, id: i64) -> Result<Dap, ApiError> {
    store
        .dap_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Dap version {} not found", id)))
}

pub async fn find_user(store: &dyn Store, username: &str) -> Result<User, ApiError> {
    store
        .user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", username)))
}

/// Summary used wherever a dap is listed
pub fn metadap_summary(metadap: &MetaDap) -> Value {
    json!({
        "package_name": metadap.package_name,
        "active": metadap.active,
        "average_rank": metadap.average_rank,
        "rank_count": metadap.rank_count,
        "url": dap_path(&metadap.package_name),
    })
}

pub fn dap_summary(metadap: &MetaDap, dap: &Dap) -> Value {
    json!({
        "id": dap.id,
        "version": dap.version,
        "license": dap.license,
        "summary": dap.summary,
        "description": dap.description,
        "authors": dap.authors,
        "homepage": dap.homepage,
        "bugreports": dap.bugreports,
        "uploaded_at": dap.uploaded_at,
        "is_pre": dap.is_pre(),
        "is_latest": metadap.latest_id == Some(dap.id),
        "is_latest_stable": metadap.latest_stable_id == Some(dap.id),
        "url": version_path(&metadap.package_name, &dap.version),
        "download": format!("{}download/", version_path(&metadap.package_name, &dap.version)),
    })
}

/// Context of the dap page: the package, the shown version, similar daps,
/// the visitor's rank and the unsolved report count
pub async fn dap_page_context(
    state: &AppState,
    session: &Session,
    metadap: &MetaDap,
    shown: Option<&Dap>,
) -> Result<Value, ApiError> {
    let store = state.store.as_ref();
    let owner = store.user_by_id(metadap.user_id).await?;
    let comaintainers = store.comaintainers(metadap.id).await?;
    let versions = store.daps_of(metadap.id).await?;
    let tags = store.tags_of(metadap.id).await?;
    let similar = store.similar_active(metadap.id, SIMILAR_ON_PAGE).await?;
    let reports = store.unsolved_report_count(metadap.id).await?;
    let rank = get_rank(store, metadap, session.user()).await?;

    let (maintainer, administrator) = match session.user() {
        Some(user) => (
            can_maintain(store, user, metadap).await?,
            can_administrate(user, metadap),
        ),
        None => (false, false),
    };

    Ok(json!({
        "metadap": metadap_summary(metadap),
        "owner": owner.map(|u| u.username),
        "comaintainers": comaintainers.into_iter().map(|u| u.username).collect::<Vec<_>>(),
        "dap": shown.map(|d| dap_summary(metadap, d)),
        "versions": versions.iter().map(|d| d.version.as_str()).collect::<Vec<_>>(),
        "tags": tags,
        "similar": similar.iter().map(metadap_summary).collect::<Vec<_>>(),
        "rank": rank,
        "reports": reports,
        "can_maintain": maintainer,
        "can_administrate": administrator,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(dap_path("foo"), "/dap/foo/");
        assert_eq!(version_path("foo", "1.0"), "/dap/foo/1.0/");
        assert_eq!(user_path("bob"), "/user/bob/");
    }
}
