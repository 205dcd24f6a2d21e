use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Form,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::captcha;
use crate::database::models::{Dap, MetaDap, Problem, Report};
use crate::error::ApiError;
use crate::forms::report::{bind_report, report_form};
use crate::forms::Form as PageForm;
use crate::handlers::utils::{dap_path, find_metadap, form_data, metadap_summary};
use crate::middleware::{FlashRedirect, Page, PageResult, Session};
use crate::services::file_report;

fn render(session: &Session, metadap: &MetaDap, form: PageForm) -> PageResult {
    let context = json!({
        "dap": metadap_summary(metadap),
        "form": form,
    });
    Ok(Page::new("dap-report", session, context).into_response())
}

/// GET /dap/:dap/report/ - Report form; anonymous visitors get a captcha
pub async fn report_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let daps = store.daps_of(metadap.id).await?;

    let challenge = session
        .user()
        .is_none()
        .then(|| captcha::challenge(&state.config.security.captcha_secret));
    render(&session, &metadap, report_form(&daps, challenge.as_ref()))
}

/// POST /dap/:dap/report/ - File a report and notify the owner and admins
pub async fn report_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let daps = store.daps_of(metadap.id).await?;
    let data = form_data(pairs);

    let bound = match session.user() {
        Some(_) => bind_report(&daps, &data, None),
        None => {
            let secret = state.config.security.captcha_secret.as_str();
            let check = |key: &str, answer: &str| state.captchas.redeem(secret, key, answer);
            let verify: &dyn Fn(&str, &str) -> bool = &check;
            let fresh = captcha::challenge(secret);
            bind_report(&daps, &data, Some((verify, &fresh)))
        }
    };

    match bound.cleaned {
        Some(input) => {
            file_report(
                store,
                state.mailer.as_ref(),
                &state.config,
                &metadap,
                session.user(),
                input,
            )
            .await?;
            Ok(FlashRedirect::to(dap_path(&name))
                .info("Dap successfully reported.")
                .into_response())
        }
        None => render(&session, &metadap, bound.form),
    }
}

/// GET /dap/:dap/reports/ - Staff see every report, others the unsolved ones
pub async fn reports(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> PageResult {
    let store = state.store.as_ref();
    let metadap = find_metadap(store, &name).await?;
    let staff = session.is_staff();
    let daps = store.daps_of(metadap.id).await?;

    let mut rendered = Vec::new();
    for report in store.reports_of(metadap.id, staff).await? {
        rendered.push(report_summary(&state, &report, &daps, staff).await?);
    }

    let context = json!({
        "dap": metadap_summary(&metadap),
        "reports": rendered,
    });
    Ok(Page::new("dap-reports", &session, context).into_response())
}

async fn report_summary(
    state: &AppState,
    report: &Report,
    daps: &[Dap],
    staff: bool,
) -> Result<Value, ApiError> {
    let reporter = match report.reporter_id {
        Some(id) => state.store.user_by_id(id).await?.map(|u| u.username),
        None => None,
    };
    let versions: Vec<&str> = daps
        .iter()
        .filter(|d| report.versions.contains(&d.id))
        .map(|d| d.version.as_str())
        .collect();

    Ok(json!({
        "id": report.id,
        "problem": report.problem,
        "problem_label": Problem::parse(&report.problem).map(|p| p.label()),
        "message": report.message,
        "versions": versions,
        "reporter": reporter,
        "email": if staff { Some(report.email.as_str()) } else { None },
        "solved": report.solved,
        "created_at": report.created_at,
    }))
}
