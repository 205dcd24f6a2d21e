use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{FlashRedirect, PageResult, Session};

/// POST /report/:report_id/toggle-solve/ - Mark a report solved or unsolved
pub async fn toggle_solve(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(report_id): Path<i64>,
) -> PageResult {
    let user = session.require_user()?;
    let not_found = || ApiError::not_found(format!("Report {} not found", report_id));
    if !user.is_staff {
        tracing::warn!("{} tried to toggle report {}", user.username, report_id);
        return Err(not_found());
    }

    let store = state.store.as_ref();
    let report = store.report_by_id(report_id).await?.ok_or_else(not_found)?;
    store.set_report_solved(report.id, !report.solved).await?;
    let metadap = store
        .metadap_by_id(report.metadap_id)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(
        "{} marked report {} of {} {}",
        user.username,
        report.id,
        metadap.package_name,
        if report.solved { "unsolved" } else { "solved" }
    );

    Ok(FlashRedirect::to(format!("/dap/{}/reports/", metadap.package_name))
        .info("Successfully toggled the report")
        .into_response())
}
