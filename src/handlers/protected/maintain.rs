//! Pages open to everyone maintaining a dap: tags and version removal.

use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Form,
};
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{Dap, MetaDap, User};
use crate::database::Store;
use crate::error::ApiError;
use crate::forms::dap::{bind_delete_version, bind_tags, delete_version_form, tags_form};
use crate::forms::Form as PageForm;
use crate::handlers::utils::{
    dap_path, dap_summary, find_metadap, find_version, form_data, metadap_summary, version_path,
};
use crate::middleware::{FlashRedirect, Page, PageResult, Session};
use crate::services::{can_maintain, delete_version};

const TAGS_DENIED: &str = "You don't have permissions to change tags of this dap.";
const DELETE_DENIED: &str = "You don't have permissions to delete versions of this dap.";

async fn check_maintainer(
    store: &dyn Store,
    user: &User,
    metadap: &MetaDap,
    redirect: String,
    message: &str,
) -> Result<Option<FlashRedirect>, ApiError> {
    if can_maintain(store, user, metadap).await? {
        return Ok(None);
    }
    tracing::warn!("{} may not maintain {}", user.username, metadap.package_name);
    Ok(Some(FlashRedirect::to(redirect).error(message)))
}

fn render_tags(session: &Session, metadap: &MetaDap, form: PageForm) -> PageResult {
    let context = json!({
        "dap": metadap_summary(metadap),
        "form": form,
    });
    Ok(Page::new("dap-tags", session, context).into_response())
}

/// GET /dap/:dap/tags/ - Current tags as a comma separated list
pub async fn tags_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    if let Some(denied) = check_maintainer(store, user, &metadap, dap_path(&name), TAGS_DENIED).await? {
        return Ok(denied.into_response());
    }
    let tags = store.tags_of(metadap.id).await?;
    render_tags(&session, &metadap, tags_form(&tags))
}

/// POST /dap/:dap/tags/ - Replace the tag set
pub async fn tags_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    if let Some(denied) = check_maintainer(store, user, &metadap, dap_path(&name), TAGS_DENIED).await? {
        return Ok(denied.into_response());
    }

    let bound = bind_tags(&form_data(pairs));
    let Some(tags) = bound.cleaned else {
        return render_tags(&session, &metadap, bound.form);
    };
    store.set_tags(metadap.id, &tags).await?;
    tracing::info!("{} set {} tags of {}", user.username, tags.len(), name);
    Ok(FlashRedirect::to(dap_path(&name))
        .info("Tags successfully saved.")
        .into_response())
}

fn render_delete(session: &Session, metadap: &MetaDap, dap: &Dap, form: PageForm) -> PageResult {
    let context = json!({
        "metadap": metadap_summary(metadap),
        "dap": dap_summary(metadap, dap),
        "form": form,
    });
    Ok(Page::new("dap-version-delete", session, context).into_response())
}

/// GET /dap/:dap/:version/delete/ - Confirmation form
pub async fn delete_version_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((name, version)): Path<(String, String)>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let dap = find_version(store, &metadap, &version).await?;
    let back = version_path(&name, &version);
    if let Some(denied) = check_maintainer(store, user, &metadap, back, DELETE_DENIED).await? {
        return Ok(denied.into_response());
    }
    render_delete(&session, &metadap, &dap, delete_version_form())
}

/// POST /dap/:dap/:version/delete/ - Remove one version and its archive
pub async fn delete_version_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((name, version)): Path<(String, String)>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let dap = find_version(store, &metadap, &version).await?;
    let back = version_path(&name, &version);
    if let Some(denied) = check_maintainer(store, user, &metadap, back, DELETE_DENIED).await? {
        return Ok(denied.into_response());
    }

    let bound = bind_delete_version(&metadap, &version, &form_data(pairs));
    if bound.cleaned.is_none() {
        return render_delete(&session, &metadap, &dap, bound.form);
    }
    delete_version(store, &state.media, &dap).await?;
    let label = dap.label(&name);
    tracing::info!("{} deleted {}", user.username, label);
    Ok(FlashRedirect::to(dap_path(&name))
        .info(format!("Successfully deleted {}.", label))
        .into_response())
}
