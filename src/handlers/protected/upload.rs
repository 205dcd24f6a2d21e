use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::forms::dap::{upload_form, upload_form_with_errors};
use crate::forms::{Form, REQUIRED};
use crate::handlers::utils::dap_path;
use crate::middleware::{FlashRedirect, Page, PageResult, Session};
use crate::services::{handle_uploaded_dap, UploadError};

fn render(session: &Session, form: Form) -> PageResult {
    Ok(Page::new("upload", session, json!({ "form": form })).into_response())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("The uploaded file is too large")
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// GET /upload/ - Upload form
pub async fn upload_get(Extension(session): Extension<Session>) -> PageResult {
    session.require_user()?;
    render(&session, upload_form())
}

/// POST /upload/ - Accept a new dap or a new version of one
pub async fn upload_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> PageResult {
    let user = session.require_user()?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if !filename.is_empty() && !bytes.is_empty() {
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let Some((filename, bytes)) = upload else {
        return render(&session, upload_form_with_errors(vec![REQUIRED.to_string()]));
    };

    match handle_uploaded_dap(state.store.as_ref(), &state.media, user, &filename, &bytes).await {
        Ok(metadap) => {
            tracing::info!("{} uploaded {}", user.username, filename);
            Ok(FlashRedirect::to(dap_path(&metadap.package_name))
                .info("Dap successfully uploaded.")
                .into_response())
        }
        Err(UploadError::Invalid(errors)) => {
            tracing::debug!("Rejected upload {} from {}", filename, user.username);
            render(&session, upload_form_with_errors(errors))
        }
        Err(e) => Err(e.into()),
    }
}
