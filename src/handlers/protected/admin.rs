use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Form,
};
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{MetaDap, User};
use crate::database::Store;
use crate::error::ApiError;
use crate::forms::dap::{
    activation_form, bind_activation, bind_comaintainers, bind_delete_dap, bind_leave,
    bind_transfer, comaintainers_form, delete_dap_form, leave_form, transfer_form,
};
use crate::forms::Form as PageForm;
use crate::handlers::utils::{dap_path, find_metadap, form_data, metadap_summary};
use crate::middleware::{FlashRedirect, Page, PageResult, Session};
use crate::services::{can_administrate, delete_metadap};

/// The four administration forms of a dap
struct AdminForms {
    cform: PageForm,
    tform: PageForm,
    aform: PageForm,
    dform: PageForm,
}

impl AdminForms {
    async fn unbound(store: &dyn Store, metadap: &MetaDap) -> Result<Self, ApiError> {
        let owner = store
            .user_by_id(metadap.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", metadap.user_id)))?;
        Ok(Self {
            cform: comaintainers_form(&store.comaintainers(metadap.id).await?),
            tform: transfer_form(&owner),
            aform: activation_form(metadap),
            dform: delete_dap_form(),
        })
    }

    fn render(self, session: &Session, metadap: &MetaDap) -> PageResult {
        let context = json!({
            "dap": metadap_summary(metadap),
            "cform": self.cform,
            "tform": self.tform,
            "aform": self.aform,
            "dform": self.dform,
        });
        Ok(Page::new("dap-admin", session, context).into_response())
    }
}

/// Owner or superuser, else a redirect with an error
fn check_administrator(user: &User, metadap: &MetaDap) -> Option<FlashRedirect> {
    if can_administrate(user, metadap) {
        return None;
    }
    tracing::warn!("{} may not administrate {}", user.username, metadap.package_name);
    Some(
        FlashRedirect::to(dap_path(&metadap.package_name))
            .error("You don't have permissions to administrate this dap."),
    )
}

/// GET /dap/:dap/admin/ - Comaintainers, transfer, activation and deletion
pub async fn admin_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    if let Some(denied) = check_administrator(user, &metadap) {
        return Ok(denied.into_response());
    }
    AdminForms::unbound(store, &metadap)
        .await?
        .render(&session, &metadap)
}

/// POST /dap/:dap/admin/ - The submitted form is picked by its key
pub async fn admin_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let mut metadap = find_metadap(store, &name).await?;
    if let Some(denied) = check_administrator(user, &metadap) {
        return Ok(denied.into_response());
    }
    let data = form_data(pairs);
    let mut forms = AdminForms::unbound(store, &metadap).await?;
    let back = dap_path(&name);

    if data.contains("cform") {
        let bound = bind_comaintainers(store, &metadap, &data).await?;
        match bound.cleaned {
            Some(users) => {
                let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
                store.set_comaintainers(metadap.id, &ids).await?;
                tracing::info!("{} set {} comaintainers of {}", user.username, ids.len(), name);
                return Ok(FlashRedirect::to(back)
                    .info("Comaintainers successfully saved.")
                    .into_response());
            }
            None => forms.cform = bound.form,
        }
    }

    if data.contains("tform") {
        let bound = bind_transfer(store, &metadap, &data).await?;
        match bound.cleaned {
            Some(new_owner) => {
                store.transfer_ownership(metadap.id, new_owner.id).await?;
                tracing::info!("{} transferred {} to {}", user.username, name, new_owner.username);
                return Ok(FlashRedirect::to(back)
                    .info(format!("Dap {} successfully transfered.", name))
                    .into_response());
            }
            None => forms.tform = bound.form,
        }
    }

    if data.contains("aform") {
        let bound = bind_activation(&metadap, &data);
        match bound.cleaned {
            Some(active) => {
                metadap.active = active;
                store.update_metadap(&metadap).await?;
                let de = if active { "" } else { "de" };
                tracing::info!("{} {}activated {}", user.username, de, name);
                return Ok(FlashRedirect::to(back)
                    .info(format!("Dap {} successfully {}activated.", name, de))
                    .into_response());
            }
            None => forms.aform = bound.form,
        }
    }

    if data.contains("dform") {
        let bound = bind_delete_dap(&metadap, &data);
        match bound.cleaned {
            Some(()) => {
                delete_metadap(store, &state.media, &metadap).await?;
                tracing::info!("{} deleted dap {}", user.username, name);
                return Ok(FlashRedirect::to("/")
                    .info(format!("Dap {} successfully deleted.", name))
                    .into_response());
            }
            None => forms.dform = bound.form,
        }
    }

    forms.render(&session, &metadap)
}

/// Comaintainers only; the owner has to transfer the dap first
async fn check_leaver(store: &dyn Store, user: &User, metadap: &MetaDap) -> Result<Option<FlashRedirect>, ApiError> {
    let back = FlashRedirect::to(dap_path(&metadap.package_name));
    if metadap.is_owner(user) {
        return Ok(Some(
            back.error("You cannot leave this dap. First, transfer it to someone else."),
        ));
    }
    let comaintainers = store.comaintainers(metadap.id).await?;
    if !comaintainers.iter().any(|c| c.id == user.id) {
        return Ok(Some(
            back.error("You cannot leave this dap, you are not it's comaintainer."),
        ));
    }
    Ok(None)
}

fn render_leave(session: &Session, metadap: &MetaDap, form: PageForm) -> PageResult {
    let context = json!({
        "dap": metadap_summary(metadap),
        "form": form,
    });
    Ok(Page::new("dap-leave", session, context).into_response())
}

/// GET /dap/:dap/leave/ - Resignation form for comaintainers
pub async fn leave_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    if let Some(denied) = check_leaver(store, user, &metadap).await? {
        return Ok(denied.into_response());
    }
    render_leave(&session, &metadap, leave_form())
}

/// POST /dap/:dap/leave/ - Stop comaintaining the dap
pub async fn leave_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let user = session.require_user()?;
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    if let Some(denied) = check_leaver(store, user, &metadap).await? {
        return Ok(denied.into_response());
    }

    let bound = bind_leave(&metadap, &form_data(pairs));
    if bound.cleaned.is_none() {
        return render_leave(&session, &metadap, bound.form);
    }
    store.remove_comaintainer(metadap.id, user.id).await?;
    tracing::info!("{} left {}", user.username, name);
    Ok(FlashRedirect::to(dap_path(&name))
        .info(format!("Successfully leaved {}.", name))
        .into_response())
}
