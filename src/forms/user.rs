use crate::database::models::{SocialAuth, User};
use crate::database::{Store, StoreResult};

use super::{is_valid_email, verification_mismatch, Bound, Choice, Field, Form, FormData, Widget};

const SYNCED_HELP: &str = "Further fields cannot be edited, because at least one service is configured to override those data on login. See below to disable it.";

const SYNCED_FIELDS: [&str; 3] = ["email", "first_name", "last_name"];

/// Usernames allow letters, digits and `@.+-_`
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

/// Profile form; with `synced` the e-mail and names are read-only
pub fn user_form(user: &User, synced: bool) -> Form {
    let mut form = Form::new("uform")
        .field(
            Field::text("username", 30)
                .help("Required. 30 characters or fewer. Letters, digits and @/./+/-/_ only.")
                .value(user.username.clone()),
        )
        .field(
            Field::new("email", Widget::Email)
                .optional()
                .max_length(254)
                .value(user.email.clone()),
        )
        .field(Field::text("first_name", 30).optional().value(user.first_name.clone()))
        .field(Field::text("last_name", 30).optional().value(user.last_name.clone()));

    if synced {
        for name in SYNCED_FIELDS {
            if let Some(field) = form.field_mut(name) {
                field.readonly = true;
            }
        }
        if let Some(field) = form.field_mut("email") {
            field.help_text = SYNCED_HELP.to_string();
        }
    }
    form
}

/// Returns the edited user. Read-only fields keep their stored values.
pub async fn bind_user(
    store: &dyn Store,
    user: &User,
    synced: bool,
    data: &FormData,
) -> StoreResult<Bound<User>> {
    let mut form = user_form(user, synced);
    let mut edited = user.clone();

    edited.username = form.clean_text(data, "username");
    if !edited.username.is_empty() && !form.errors.has("username") {
        if !is_valid_username(&edited.username) {
            form.errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers and @/./+/-/_ characters.",
            );
        } else if edited.username != user.username {
            if let Some(other) = store.user_by_username(&edited.username).await? {
                if other.id != user.id {
                    form.errors
                        .add("username", "A user with that username already exists.");
                }
            }
        }
    }

    if !synced {
        edited.email = form.clean_text(data, "email");
        if !edited.email.is_empty() && !is_valid_email(&edited.email) {
            form.errors.add("email", "Enter a valid email address.");
        }
        edited.first_name = form.clean_text(data, "first_name");
        edited.last_name = form.clean_text(data, "last_name");
    }

    Ok(Bound::new(form, edited))
}

/// Sync choices are the user's own social auths, labelled by provider
pub fn profile_sync_form(auths: &[SocialAuth], selected: &[i64]) -> Form {
    let choices = auths
        .iter()
        .map(|a| Choice::new(a.id.to_string(), a.provider.clone()))
        .collect();
    let values: Vec<String> = selected.iter().map(i64::to_string).collect();
    Form::new("pform").field(
        Field::new("syncs", Widget::SelectMultiple)
            .optional()
            .choices(choices)
            .help("Select services, that will override your name and e-mail on login.")
            .value(values),
    )
}

pub fn bind_profile_sync(auths: &[SocialAuth], data: &FormData) -> Bound<Vec<i64>> {
    let mut form = profile_sync_form(auths, &[]);
    let mut ids: Vec<i64> = form
        .clean_multiple_choice(data, "syncs")
        .iter()
        .filter_map(|v| v.parse().ok())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Bound::new(form, ids)
}

pub fn delete_user_form() -> Form {
    Form::new("dform").field(
        Field::text("verification", 30).help("Enter the username to confirm the deletion."),
    )
}

pub fn bind_delete_user(user: &User, data: &FormData) -> Bound<()> {
    let mut form = delete_user_form();
    let typed = form.clean_text(data, "verification");
    if form.is_valid() && typed != user.username {
        form.errors
            .set("verification", verification_mismatch("username"));
    }
    Bound::new(form, ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewUser;
    use crate::database::{MemoryStore, UserRepo};

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    async fn fixture() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                email: "old@example.com".into(),
                first_name: "Old".into(),
                ..NewUser::named("bob")
            })
            .await
            .unwrap();
        store.create_user(NewUser::named("alice")).await.unwrap();
        (store, user)
    }

    #[test]
    fn username_characters() {
        assert!(is_valid_username("bob.smith+dapi@x"));
        assert!(!is_valid_username("bob smith"));
        assert!(!is_valid_username("bob/"));
    }

    #[tokio::test]
    async fn edits_profile() {
        let (store, user) = fixture().await;
        let bound = bind_user(
            &store,
            &user,
            false,
            &data(&[("username", "bobby"), ("email", "new@example.com"), ("first_name", "New")]),
        )
        .await
        .unwrap();
        let edited = bound.cleaned.unwrap();
        assert_eq!(edited.username, "bobby");
        assert_eq!(edited.email, "new@example.com");
        assert_eq!(edited.first_name, "New");
        assert_eq!(edited.last_name, "");
    }

    #[tokio::test]
    async fn synced_fields_are_ignored() {
        let (store, user) = fixture().await;
        let bound = bind_user(
            &store,
            &user,
            true,
            &data(&[("username", "bob"), ("email", "evil@example.com"), ("first_name", "Evil")]),
        )
        .await
        .unwrap();
        assert!(bound.form.get_field("email").unwrap().readonly);
        let edited = bound.cleaned.unwrap();
        assert_eq!(edited.email, "old@example.com");
        assert_eq!(edited.first_name, "Old");
    }

    #[tokio::test]
    async fn username_must_be_unique() {
        let (store, user) = fixture().await;
        let bound = bind_user(&store, &user, false, &data(&[("username", "alice")]))
            .await
            .unwrap();
        assert_eq!(
            bound.form.errors.get("username"),
            ["A user with that username already exists."]
        );
    }

    #[test]
    fn syncs_limited_to_own_auths() {
        let auths = [SocialAuth {
            id: 3,
            user_id: 1,
            provider: "github".into(),
            uid: "42".into(),
            username: "bob".into(),
        }];
        let bound = bind_profile_sync(&auths, &data(&[("syncs", "3")]));
        assert_eq!(bound.cleaned, Some(vec![3]));
        let bound = bind_profile_sync(&auths, &data(&[("syncs", "4")]));
        assert!(bound.cleaned.is_none());
        let bound = bind_profile_sync(&auths, &data(&[]));
        assert_eq!(bound.cleaned, Some(vec![]));
    }

    #[tokio::test]
    async fn delete_requires_username() {
        let (_, user) = fixture().await;
        let bound = bind_delete_user(&user, &data(&[("verification", "alice")]));
        assert_eq!(
            bound.form.errors.get("verification"),
            ["You didn't enter the username correctly."]
        );
        assert!(bind_delete_user(&user, &data(&[("verification", "bob")]))
            .cleaned
            .is_some());
    }
}
