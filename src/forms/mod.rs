//! Form binding and validation.
//!
//! A [`Form`] describes its fields (for rendering) and carries the bound
//! values and per-field errors. Each form module offers an unbound
//! constructor for GET and a `bind` function for POST returning a
//! [`Bound`] with the cleaned data when validation passed.

pub mod dap;
pub mod report;
pub mod user;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub const REQUIRED: &str = "This field is required.";

/// Submitted urlencoded pairs; keys may repeat
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Last value submitted under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }
}

impl From<Vec<(String, String)>> for FormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Replaces the messages of a field
    pub fn set(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), vec![message.into()]);
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    Text,
    Textarea,
    Email,
    Checkbox,
    Select,
    SelectMultiple,
    File,
    Captcha,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub widget: Widget,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub help_text: String,
    pub readonly: bool,
    pub value: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl Field {
    pub fn new(name: &'static str, widget: Widget) -> Self {
        Self {
            name,
            widget,
            required: true,
            max_length: None,
            help_text: String::new(),
            readonly: false,
            value: Value::Null,
            choices: Vec::new(),
        }
    }

    pub fn text(name: &'static str, max_length: usize) -> Self {
        Self::new(name, Widget::Text).max_length(max_length)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn help(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = help_text.into();
        self
    }

    pub fn choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    /// POST key selecting this form on pages with several forms
    #[serde(skip_serializing_if = "str::is_empty")]
    pub prefix: &'static str,
    pub fields: Vec<Field>,
    pub errors: FormErrors,
}

impl Form {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            fields: Vec::new(),
            errors: FormErrors::default(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) {
        if let Some(field) = self.field_mut(name) {
            field.value = value.into();
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Binds a text-like field: trims, records the value, checks required
    /// and max length. Returns the cleaned value.
    pub fn clean_text(&mut self, data: &FormData, name: &'static str) -> String {
        let Some(field) = self.get_field(name) else {
            return String::new();
        };
        let (required, max_length) = (field.required, field.max_length);
        let value = data.get(name).unwrap_or("").trim().to_string();
        self.set_value(name, value.clone());

        if value.is_empty() {
            if required {
                self.errors.add(name, REQUIRED);
            }
            return value;
        }
        if let Some(max) = max_length {
            let len = value.chars().count();
            if len > max {
                self.errors.add(
                    name,
                    format!("Ensure this value has at most {} characters (it has {}).", max, len),
                );
            }
        }
        value
    }

    /// Binds a checkbox: present with a truthy value means checked
    pub fn clean_checkbox(&mut self, data: &FormData, name: &'static str) -> bool {
        let checked = matches!(
            data.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("on" | "true" | "1" | "yes")
        );
        self.set_value(name, checked);
        checked
    }

    /// Binds a single choice field against the field's choices
    pub fn clean_choice(&mut self, data: &FormData, name: &'static str) -> Option<String> {
        let value = data.get(name).unwrap_or("").trim().to_string();
        self.set_value(name, value.clone());
        let field = self.get_field(name)?;
        if value.is_empty() {
            if field.required {
                self.errors.add(name, REQUIRED);
            }
            return None;
        }
        if !field.choices.iter().any(|c| c.value == value) {
            self.errors.add(name, invalid_choice(&value));
            return None;
        }
        Some(value)
    }

    /// Binds a multiple choice field against the field's choices
    pub fn clean_multiple_choice(&mut self, data: &FormData, name: &'static str) -> Vec<String> {
        let values: Vec<String> = data
            .get_all(name)
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        self.set_value(name, values.clone());
        let Some(field) = self.get_field(name) else {
            return Vec::new();
        };
        if values.is_empty() && field.required {
            self.errors.add(name, REQUIRED);
            return values;
        }
        let invalid: Vec<String> = values
            .iter()
            .filter(|v| !field.choices.iter().any(|c| &c.value == *v))
            .cloned()
            .collect();
        for value in invalid {
            self.errors.add(name, invalid_choice(&value));
        }
        values
    }
}

pub fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {} is not one of the available choices.", value)
}

/// A validated (or rejected) form submission
#[derive(Debug, Clone)]
pub struct Bound<T> {
    pub form: Form,
    pub cleaned: Option<T>,
}

impl<T> Bound<T> {
    /// Keeps `cleaned` only when the form has no errors
    pub fn new(form: Form, cleaned: T) -> Self {
        let cleaned = form.is_valid().then_some(cleaned);
        Self { form, cleaned }
    }
}

/// Loose e-mail check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

/// Error for a retyped confirmation string that did not match
pub fn verification_mismatch(what: &str) -> String {
    format!("You didn't enter the {} correctly.", what)
}
