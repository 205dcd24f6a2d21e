use std::io::ErrorKind;

use axum::{
    extract::{Extension, Path, State},
    http::header,
    response::IntoResponse,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::utils::{dap_page_context, find_metadap, find_version};
use crate::middleware::{Page, PageResult, Session};

/// GET /dap/:dap/ - Latest stable version, else the latest one, else none
pub async fn dap(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let shown = match metadap.latest_stable_id.or(metadap.latest_id) {
        Some(id) => store.dap_by_id(id).await?,
        None => None,
    };
    let context = dap_page_context(&state, &session, &metadap, shown.as_ref()).await?;
    Ok(Page::new("dap", &session, context).into_response())
}

/// GET /dap/:dap/devel/ - Latest version, even a pre-release
pub async fn devel(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let shown = match metadap.latest_id {
        Some(id) => store.dap_by_id(id).await?,
        None => None,
    }
    .ok_or_else(|| ApiError::not_found(format!("Dap {} has no versions", name)))?;
    let context = dap_page_context(&state, &session, &metadap, Some(&shown)).await?;
    Ok(Page::new("dap", &session, context).into_response())
}

/// GET /dap/:dap/stable/ - Latest stable version
pub async fn stable(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let shown = match metadap.latest_stable_id {
        Some(id) => store.dap_by_id(id).await?,
        None => None,
    }
    .ok_or_else(|| ApiError::not_found(format!("Dap {} has no stable version", name)))?;
    let context = dap_page_context(&state, &session, &metadap, Some(&shown)).await?;
    Ok(Page::new("dap", &session, context).into_response())
}

/// GET /dap/:dap/:version/ - One particular version
pub async fn version(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((name, version)): Path<(String, String)>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let shown = find_version(store, &metadap, &version).await?;
    let context = dap_page_context(&state, &session, &metadap, Some(&shown)).await?;
    Ok(Page::new("dap", &session, context).into_response())
}

/// GET /dap/:dap/:version/download/ - The stored archive
pub async fn download(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let dap = find_version(store, &metadap, &version).await?;

    let bytes = match state.media.read(&dap.file).await {
        Ok(bytes) => bytes,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput) => {
            return Err(ApiError::not_found(format!("File of {} not found", dap.label(&name))))
        }
        Err(e) => {
            tracing::error!("Could not read {}: {}", dap.file, e);
            return Err(ApiError::internal_server_error("Could not read the dap file"));
        }
    };

    let disposition = format!("attachment; filename=\"{}.dap\"", dap.label(&name));
    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
