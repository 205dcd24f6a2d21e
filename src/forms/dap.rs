//! Forms acting on a dap: upload, administration, tags and version removal.

use crate::database::models::{MetaDap, NewTag, Tag, User};
use crate::database::{Store, StoreResult};
use crate::package::{join_tags, parse_tags, slugify};

use super::{verification_mismatch, Bound, Field, Form, FormData, Widget, REQUIRED};

const NAME_MISMATCH: &str = "dap's name";

fn verify_help(what: &str, why: &str) -> String {
    format!("Enter the {} of this dap to verify the {}.", what, why)
}

fn verification_field(help: impl Into<String>) -> Field {
    Field::text("verification", 200).help(help)
}

/// Checks a retyped dap name, replacing the field errors on mismatch
fn verify_name(form: &mut Form, field: &str, typed: &str, metadap: &MetaDap) {
    if form.is_valid() && typed != metadap.package_name {
        form.errors.set(field, verification_mismatch(NAME_MISMATCH));
    }
}

pub fn upload_form() -> Form {
    Form::new("").field(Field::new("file", Widget::File))
}

/// Upload form with the given archive problems attached to `file`
pub fn upload_form_with_errors(errors: Vec<String>) -> Form {
    let mut form = upload_form();
    for error in errors {
        form.errors.add("file", error);
    }
    form
}

pub fn comaintainers_form(comaintainers: &[User]) -> Form {
    let usernames: Vec<&str> = comaintainers.iter().map(|u| u.username.as_str()).collect();
    Form::new("cform").field(
        Field::new("comaintainers", Widget::SelectMultiple)
            .optional()
            .value(usernames),
    )
}

/// Resolves the submitted usernames; the owner and unknown users are invalid
pub async fn bind_comaintainers(
    store: &dyn Store,
    metadap: &MetaDap,
    data: &FormData,
) -> StoreResult<Bound<Vec<User>>> {
    let mut form = comaintainers_form(&[]);
    let names: Vec<String> = data
        .get_all("comaintainers")
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    form.set_value("comaintainers", names.clone());

    let mut users: Vec<User> = Vec::new();
    for name in names {
        match store.user_by_username(&name).await? {
            Some(user) if user.id != metadap.user_id => {
                if !users.iter().any(|u| u.id == user.id) {
                    users.push(user);
                }
            }
            _ => form.errors.add("comaintainers", super::invalid_choice(&name)),
        }
    }
    Ok(Bound::new(form, users))
}

pub fn transfer_form(owner: &User) -> Form {
    Form::new("tform")
        .field(Field::new("user", Widget::Select).value(owner.username.clone()))
        .field(verification_field("Type the name of this dap to verify the transfer."))
}

/// Resolves the new owner and checks the typed dap name
pub async fn bind_transfer(
    store: &dyn Store,
    metadap: &MetaDap,
    data: &FormData,
) -> StoreResult<Bound<User>> {
    let mut form = Form::new("tform")
        .field(Field::new("user", Widget::Select))
        .field(verification_field("Type the name of this dap to verify the transfer."));

    let username = data.get("user").unwrap_or("").trim().to_string();
    form.set_value("user", username.clone());
    let new_owner = if username.is_empty() {
        form.errors.add("user", REQUIRED);
        None
    } else {
        let found = store.user_by_username(&username).await?;
        if found.is_none() {
            form.errors.add(
                "user",
                "Select a valid choice. That choice is not one of the available choices.",
            );
        }
        found
    };
    let typed = form.clean_text(data, "verification");
    verify_name(&mut form, "verification", &typed, metadap);

    Ok(match new_owner {
        Some(user) => Bound::new(form, user),
        None => Bound {
            form,
            cleaned: None,
        },
    })
}

pub fn activation_form(metadap: &MetaDap) -> Form {
    Form::new("aform")
        .field(
            Field::new("active", Widget::Checkbox)
                .optional()
                .value(metadap.active),
        )
        .field(verification_field(verify_help("name", "deactivation")))
}

/// Returns the requested active flag
pub fn bind_activation(metadap: &MetaDap, data: &FormData) -> Bound<bool> {
    let mut form = activation_form(metadap);
    let active = form.clean_checkbox(data, "active");
    let typed = form.clean_text(data, "verification");
    verify_name(&mut form, "verification", &typed, metadap);
    Bound::new(form, active)
}

pub fn delete_dap_form() -> Form {
    Form::new("dform").field(verification_field(verify_help("name", "deletion")))
}

pub fn bind_delete_dap(metadap: &MetaDap, data: &FormData) -> Bound<()> {
    let mut form = delete_dap_form();
    let typed = form.clean_text(data, "verification");
    verify_name(&mut form, "verification", &typed, metadap);
    Bound::new(form, ())
}

pub fn leave_form() -> Form {
    Form::new("").field(verification_field(
        "Type the name of this dap to verify the leaving.",
    ))
}

pub fn bind_leave(metadap: &MetaDap, data: &FormData) -> Bound<()> {
    let mut form = leave_form();
    let typed = form.clean_text(data, "verification");
    verify_name(&mut form, "verification", &typed, metadap);
    Bound::new(form, ())
}

pub fn delete_version_form() -> Form {
    Form::new("")
        .field(Field::text("verification_name", 200).help(verify_help("name", "deletion")))
        .field(Field::text("verification_version", 200).help(verify_help("version", "deletion")))
}

/// Both the dap name and the version must be retyped
pub fn bind_delete_version(metadap: &MetaDap, version: &str, data: &FormData) -> Bound<()> {
    let mut form = delete_version_form();
    let name = form.clean_text(data, "verification_name");
    let typed_version = form.clean_text(data, "verification_version");
    if form.is_valid() {
        if name != metadap.package_name {
            form.errors
                .set("verification_name", verification_mismatch(NAME_MISMATCH));
        }
        if typed_version != version {
            form.errors
                .set("verification_version", verification_mismatch("version"));
        }
    }
    Bound::new(form, ())
}

pub fn tags_form(tags: &[Tag]) -> Form {
    Form::new("").field(
        Field::new("tags", Widget::Text)
            .optional()
            .help("A comma-separated list of tags.")
            .value(join_tags(tags.iter().map(|t| t.name.as_str()))),
    )
}

/// Lower-cases and splits the tags; each needs a usable slug
pub fn bind_tags(data: &FormData) -> Bound<Vec<NewTag>> {
    let mut form = tags_form(&[]);
    let raw = data.get("tags").unwrap_or("").to_string();
    form.set_value("tags", raw.trim());

    let mut tags = Vec::new();
    for name in parse_tags(&raw) {
        let slug = slugify(&name);
        if slug.is_empty() {
            form.errors
                .add("tags", format!("{} is not a valid tag.", name));
        } else if name.chars().count() > 100 {
            form.errors.add(
                "tags",
                format!("Tag {} is longer than 100 characters.", name),
            );
        } else {
            tags.push(NewTag { name, slug });
        }
    }
    Bound::new(form, tags)
}
