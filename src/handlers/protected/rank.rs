use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::utils::{dap_path, find_metadap};
use crate::middleware::{FlashRedirect, PageResult, Session};
use crate::services::ranking::MAX_RANK;
use crate::services::rank_dap;

/// POST /dap/:dap/rank/:rank/ - Rank with 1..=5, unrank with 0
pub async fn rank(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((name, raw)): Path<(String, String)>,
) -> PageResult {
    let user = session.require_user()?;
    let rank: i32 = raw
        .parse()
        .ok()
        .filter(|r| (0..=MAX_RANK).contains(r))
        .ok_or_else(|| ApiError::not_found(format!("Rank {} not found", raw)))?;
    let metadap = find_metadap(state.store.as_ref(), &name).await?;

    rank_dap(state.store.as_ref(), user, &metadap, rank).await?;
    tracing::info!("{} ranked {} with {}", user.username, name, rank);

    let message = if rank > 0 {
        format!("Successfully ranked {} with {}", name, rank)
    } else {
        format!("Successfully unranked {}", name)
    };
    Ok(FlashRedirect::to(dap_path(&name)).info(message).into_response())
}
