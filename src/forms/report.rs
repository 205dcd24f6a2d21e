//! Abuse report forms. Anonymous reporters get the shared report fields
//! plus an optional e-mail and a captcha.

use crate::captcha::Captcha;
use crate::database::models::{Dap, Problem};

use super::{is_valid_email, Bound, Choice, Field, Form, FormData, Widget};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportInput {
    pub problem: Problem,
    /// Ids of the selected daps
    pub versions: Vec<i64>,
    pub message: String,
    pub email: String,
}

fn problem_choices() -> Vec<Choice> {
    Problem::ALL
        .iter()
        .map(|p| Choice::new(p.as_str(), p.label()))
        .collect()
}

fn version_choices(daps: &[Dap]) -> Vec<Choice> {
    daps.iter()
        .map(|d| Choice::new(d.id.to_string(), d.version.clone()))
        .collect()
}

fn base_form(daps: &[Dap]) -> Form {
    Form::new("")
        .field(
            Field::new("problem", Widget::Select)
                .choices(problem_choices())
                .help("Select the type of problem you want to report."),
        )
        .field(
            Field::new("versions", Widget::SelectMultiple)
                .optional()
                .choices(version_choices(daps))
                .help("Where this problem occurs? If you are not sure, you can leave it blank."),
        )
        .field(
            Field::new("message", Widget::Textarea)
                .help("Describe the problem you want to report."),
        )
}

/// Report form; `captcha` is Some for anonymous reporters
pub fn report_form(daps: &[Dap], captcha: Option<&Captcha>) -> Form {
    let form = base_form(daps);
    match captcha {
        None => form,
        Some(captcha) => with_anonymous_fields(form, captcha),
    }
}

fn with_anonymous_fields(form: Form, captcha: &Captcha) -> Form {
    form.field(
        Field::new("email", Widget::Email)
            .optional()
            .max_length(254)
            .help("Optional. So we can inform you about the solution. We don't send spam or sell e-mail addresses."),
    )
    .field(
        Field::new("captcha", Widget::Captcha)
            .help(captcha.question.clone())
            .value(serde_json::json!({ "key": captcha.key })),
    )
}

/// Binds a report. Anonymous reporters pass the captcha check together with
/// the fresh challenge shown if the page is rendered again.
pub fn bind_report(
    daps: &[Dap],
    data: &FormData,
    anonymous: Option<(&dyn Fn(&str, &str) -> bool, &Captcha)>,
) -> Bound<ReportInput> {
    let mut form = report_form(daps, anonymous.map(|(_, c)| c));

    let problem = form
        .clean_choice(data, "problem")
        .and_then(|p| Problem::parse(&p));
    let versions: Vec<i64> = form
        .clean_multiple_choice(data, "versions")
        .iter()
        .filter_map(|v| v.parse().ok())
        .collect();
    let message = form.clean_text(data, "message");

    let mut email = String::new();
    if let Some((verify, _)) = anonymous {
        email = form.clean_text(data, "email");
        if !email.is_empty() && !is_valid_email(&email) {
            form.errors.add("email", "Enter a valid email address.");
        }
        let key = data.get("captcha_0").unwrap_or("");
        let answer = data.get("captcha_1").unwrap_or("").trim();
        if answer.is_empty() {
            form.errors.add("captcha", super::REQUIRED);
        } else if !verify(key, answer) {
            form.errors.add("captcha", "Invalid CAPTCHA");
        }
    }

    match problem {
        Some(problem) => Bound::new(
            form,
            ReportInput {
                problem,
                versions,
                message,
                email,
            },
        ),
        None => Bound {
            form,
            cleaned: None,
        },
    }
}
