use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// A user as printed by the user commands
pub fn user_details(user: &crate::database::models::User) -> Value {
    json!({
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "is_staff": user.is_staff,
            "is_superuser": user.is_superuser,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;

    #[test]
    fn user_details_hide_names() {
        let user = User {
            id: 3,
            username: "bob".into(),
            email: "bob@example.com".into(),
            first_name: "Bob".into(),
            last_name: "Builder".into(),
            is_staff: true,
            is_superuser: false,
            date_joined: chrono::Utc::now(),
        };
        let details = user_details(&user);
        assert_eq!(details["user"]["username"], "bob");
        assert_eq!(details["user"]["is_staff"], true);
        assert!(details["user"].get("first_name").is_none());
    }
}
