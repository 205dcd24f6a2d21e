use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Form,
};
use serde_json::json;

use crate::app::AppState;
use crate::auth::SESSION_COOKIE;
use crate::database::models::User;
use crate::forms::user::{
    bind_delete_user, bind_profile_sync, bind_user, delete_user_form, profile_sync_form, user_form,
};
use crate::forms::Form as PageForm;
use crate::handlers::utils::{find_user, form_data, user_path};
use crate::middleware::cookies::clear_cookie;
use crate::middleware::{FlashRedirect, Page, PageResult, Session};
use crate::services::delete_metadap;

struct EditForms {
    uform: PageForm,
    pform: PageForm,
    dform: PageForm,
}

impl EditForms {
    fn render(self, session: &Session, user: &User) -> PageResult {
        let context = json!({
            "user": {
                "username": user.username,
                "full_name": user.full_name(),
            },
            "uform": self.uform,
            "pform": self.pform,
            "dform": self.dform,
        });
        Ok(Page::new("user-edit", session, context).into_response())
    }
}

fn edit_path(username: &str) -> String {
    format!("{}edit/", user_path(username))
}

/// The user themselves or a superuser
fn check_editor(me: &User, username: &str) -> Option<FlashRedirect> {
    if me.username == username || me.is_superuser {
        return None;
    }
    tracing::warn!("{} may not edit user {}", me.username, username);
    Some(FlashRedirect::to(user_path(username)).error("You don't have permissions to edit this user."))
}

/// GET /user/:user/edit/ - Profile, sync settings and account deletion
pub async fn edit_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
) -> PageResult {
    let me = session.require_user()?;
    if let Some(denied) = check_editor(me, &username) {
        return Ok(denied.into_response());
    }
    let store = state.store.as_ref();
    let user = find_user(store, &username).await?;
    let auths = store.social_auths_of(user.id).await?;
    let syncs = store.profile_syncs(user.id).await?;

    EditForms {
        uform: user_form(&user, !syncs.is_empty()),
        pform: profile_sync_form(&auths, &syncs),
        dform: delete_user_form(),
    }
    .render(&session, &user)
}

/// POST /user/:user/edit/ - The submitted form is picked by its key
pub async fn edit_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let me = session.require_user()?;
    if let Some(denied) = check_editor(me, &username) {
        return Ok(denied.into_response());
    }
    let store = state.store.as_ref();
    let user = find_user(store, &username).await?;
    let auths = store.social_auths_of(user.id).await?;
    let syncs = store.profile_syncs(user.id).await?;
    let synced = !syncs.is_empty();
    let data = form_data(pairs);

    let mut forms = EditForms {
        uform: user_form(&user, synced),
        pform: profile_sync_form(&auths, &syncs),
        dform: delete_user_form(),
    };

    if data.contains("uform") {
        let bound = bind_user(store, &user, synced, &data).await?;
        match bound.cleaned {
            Some(edited) => {
                store.update_user(&edited).await?;
                tracing::info!("{} saved user {}", me.username, edited.username);
                return Ok(FlashRedirect::to(edit_path(&edited.username))
                    .info("User successfully saved.")
                    .into_response());
            }
            None => forms.uform = bound.form,
        }
    }

    if data.contains("pform") {
        let bound = bind_profile_sync(&auths, &data);
        match bound.cleaned {
            Some(ids) => {
                store.set_profile_syncs(user.id, &ids).await?;
                tracing::info!("{} saved sync settings of {}", me.username, user.username);
                return Ok(FlashRedirect::to(edit_path(&user.username))
                    .info("Sync settings successfully saved.")
                    .into_response());
            }
            None => forms.pform = bound.form,
        }
    }

    if data.contains("dform") {
        let bound = bind_delete_user(&user, &data);
        match bound.cleaned {
            Some(()) => {
                for metadap in store.owned_by(user.id).await? {
                    delete_metadap(store, &state.media, &metadap).await?;
                }
                store.delete_user(user.id).await?;
                tracing::info!("{} deleted user {}", me.username, user.username);
                let mut redirect = FlashRedirect::to("/")
                    .info(format!("Successfully deleted {}.", user.username));
                if me.id == user.id {
                    redirect = redirect.with_cookie(clear_cookie(SESSION_COOKIE));
                }
                return Ok(redirect.into_response());
            }
            None => forms.dform = bound.form,
        }
    }

    forms.render(&session, &user)
}

/// POST /logout/ - Drop the session cookie
pub async fn logout(Extension(session): Extension<Session>) -> PageResult {
    let me = session.require_user()?;
    tracing::info!("{} logged out", me.username);
    Ok(FlashRedirect::to("/")
        .with_cookie(clear_cookie(SESSION_COOKIE))
        .into_response())
}
