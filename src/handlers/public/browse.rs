use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{MetaDapOrder, MetaDapQuery};
use crate::error::ApiError;
use crate::handlers::utils::metadap_summary;
use crate::middleware::{Page, PageResult, Session};
use crate::services::Page as Pager;

/// Daps per list on the home page
const HOME_LIST_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// GET / - Top rated and most rated active daps
pub async fn index(State(state): State<AppState>, Extension(session): Extension<Session>) -> PageResult {
    let store = state.store.as_ref();
    let top_rated = store
        .list_metadaps(
            &MetaDapQuery::active()
                .ordered(MetaDapOrder::TopRated)
                .window(HOME_LIST_SIZE, 0),
        )
        .await?;
    let most_rated = store
        .list_metadaps(
            &MetaDapQuery::active()
                .ordered(MetaDapOrder::MostRated)
                .window(HOME_LIST_SIZE, 0),
        )
        .await?;

    let context = json!({
        "top_rated": top_rated.iter().map(metadap_summary).collect::<Vec<_>>(),
        "most_rated": most_rated.iter().map(metadap_summary).collect::<Vec<_>>(),
    });
    Ok(Page::new("index", &session, context).into_response())
}

/// GET /tag/:tag/ - Active daps with the tag, 25 per page
pub async fn tag(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let store = state.store.as_ref();
    let tag = store
        .tag_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tag {} not found", slug)))?;

    let filter = MetaDapQuery::active()
        .tagged(tag.slug.clone())
        .ordered(MetaDapOrder::TopRated);
    let count = store.count_metadaps(&filter).await?;
    let page = Pager::clamped(count, state.config.api.page_size as i64, query.page.as_deref());
    let daps = store
        .list_metadaps(&filter.window(page.per_page, page.offset()))
        .await?;

    let context = json!({
        "tag": tag,
        "daps": daps.iter().map(metadap_summary).collect::<Vec<_>>(),
        "pagination": {
            "page": page,
            "has_next": page.has_next(),
            "has_previous": page.has_previous(),
        },
    });
    Ok(Page::new("tag", &session, context).into_response())
}
