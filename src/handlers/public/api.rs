use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::api::{dap_resource, metadap_resource, user_resource, DapResource, MetaDapResource, UserResource};
use crate::app::AppState;
use crate::database::models::MetaDapQuery;
use crate::database::Window;
use crate::error::ApiError;
use crate::handlers::utils::find_dap;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Page as Pager;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

/// One page of a resource list
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

fn pager(state: &AppState, count: i64, query: &ListQuery) -> Result<Pager, ApiError> {
    Pager::get(count, state.config.api.page_size as i64, query.page.as_deref())
        .map_err(|_| ApiError::not_found("Invalid page."))
}

fn paginated<T: Serialize>(state: &AppState, list: &str, page: &Pager, results: Vec<T>) -> Paginated<T> {
    let link = |number: i64| {
        state
            .config
            .absolute_url(&format!("/api/{}/?page={}", list, number))
    };
    Paginated {
        count: page.count,
        next: page.has_next().then(|| link(page.number + 1)),
        previous: page.has_previous().then(|| link(page.number - 1)),
        results,
    }
}

/// GET /api/users/ - All users by id
pub async fn users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paginated<UserResource>> {
    let store = state.store.as_ref();
    let page = pager(&state, store.count_users().await?, &query)?;
    let users = store
        .list_users(Window {
            limit: page.per_page,
            offset: page.offset(),
        })
        .await?;

    let mut results = Vec::with_capacity(users.len());
    for user in &users {
        results.push(user_resource(store, &state.config, user).await?);
    }
    Ok(ApiResponse::success(paginated(&state, "users", &page, results)))
}

/// GET /api/users/:id/
pub async fn user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<UserResource> {
    let store = state.store.as_ref();
    let user = store
        .user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
    Ok(ApiResponse::success(user_resource(store, &state.config, &user).await?))
}

/// GET /api/metadaps/ - All daps by id, inactive ones included
pub async fn metadaps(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paginated<MetaDapResource>> {
    let store = state.store.as_ref();
    let all = MetaDapQuery::default();
    let page = pager(&state, store.count_metadaps(&all).await?, &query)?;
    let metadaps = store
        .list_metadaps(&all.window(page.per_page, page.offset()))
        .await?;

    let mut results = Vec::with_capacity(metadaps.len());
    for metadap in &metadaps {
        results.push(metadap_resource(store, &state.config, metadap).await?);
    }
    Ok(ApiResponse::success(paginated(&state, "metadaps", &page, results)))
}

/// GET /api/metadaps/:id/
pub async fn metadap(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<MetaDapResource> {
    let store = state.store.as_ref();
    let metadap = store
        .metadap_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Dap {} not found", id)))?;
    Ok(ApiResponse::success(
        metadap_resource(store, &state.config, &metadap).await?,
    ))
}

/// GET /api/daps/ - All versions by id
pub async fn daps(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paginated<DapResource>> {
    let store = state.store.as_ref();
    let page = pager(&state, store.count_daps().await?, &query)?;
    let daps = store
        .list_daps(Window {
            limit: page.per_page,
            offset: page.offset(),
        })
        .await?;

    let mut results = Vec::with_capacity(daps.len());
    for dap in &daps {
        results.push(dap_resource(store, &state.config, dap).await?);
    }
    Ok(ApiResponse::success(paginated(&state, "daps", &page, results)))
}

/// GET /api/daps/:id/
pub async fn dap(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<DapResource> {
    let store = state.store.as_ref();
    let dap = find_dap(store, id).await?;
    Ok(ApiResponse::success(dap_resource(store, &state.config, &dap).await?))
}
