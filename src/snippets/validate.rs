//! Field checks for create and update bodies.
//!
//! Bodies are read as raw JSON so that a key's presence (including an
//! explicit `null`) is distinguishable from its absence, and so type errors
//! are reported alongside every other field problem. Checking happens twice:
//! once on the raw values, and again after sanitization for values that
//! only became empty (or grew) while being cleaned.

use serde_json::{Map, Value};

use crate::{
    appresult::{AppError, AppResult, FieldErrors},
    sanitize,
};

use super::{model::SnippetChanges, secrets};

pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 1000;
pub const USERNAME_MAX: usize = 50;
pub const LANGUAGE_MAX: usize = 50;
pub const TAG_MAX: usize = 50;

/// A body key: absent, explicitly `null`, of the wrong JSON type, or a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    #[default]
    Missing,
    Null,
    Invalid,
    Value(T),
}

impl<T> Field<T> {
    fn value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawInput {
    title: Field<String>,
    description: Field<String>,
    username: Field<String>,
    language: Field<String>,
    code: Field<String>,
    tags: Field<Vec<String>>,
}

impl RawInput {
    fn read(body: &Map<String, Value>, errors: &mut FieldErrors) -> Self {
        Self {
            title: string_field(body, "title", errors),
            description: string_field(body, "description", errors),
            username: string_field(body, "username", errors),
            language: string_field(body, "language", errors),
            code: string_field(body, "code", errors),
            tags: tags_field(body, errors),
        }
    }
}

/// A validated, sanitized create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: Option<String>,
    /// `None` when the server should pick one.
    pub username: Option<String>,
    pub language: String,
    pub code: String,
    pub tags: Vec<String>,
}

pub fn object(body: &Value) -> AppResult<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| AppError::InvalidArgument("Request body must be a JSON object".to_owned()))
}

/// The `modification_code` key of an update body.
pub fn modification_code(body: &Map<String, Value>) -> AppResult<String> {
    match body.get("modification_code").and_then(Value::as_str) {
        Some(code) if secrets::is_well_formed(code) => Ok(code.to_owned()),
        Some(_) => Err(invalid_code()),
        None => Err(AppError::InvalidArgument(
            "The modification_code field is required".to_owned(),
        )),
    }
}

pub fn check_modification_code(code: Option<&str>) -> AppResult<&str> {
    code.filter(|c| secrets::is_well_formed(c)).ok_or_else(invalid_code)
}

fn invalid_code() -> AppError {
    AppError::InvalidArgument(format!(
        "The modification code must be {} alphanumeric characters",
        secrets::MODIFICATION_CODE_LEN
    ))
}

pub fn create(body: &Value) -> AppResult<Draft> {
    let body = object(body)?;
    let mut errors = FieldErrors::default();
    let input = RawInput::read(body, &mut errors);

    required(&mut errors, "title", &input.title, Some(TITLE_MAX));
    optional(&mut errors, "description", &input.description, DESCRIPTION_MAX);
    if let Field::Value(username) = &input.username {
        length(&mut errors, "username", username, true, Some(USERNAME_MAX));
    }
    required(&mut errors, "language", &input.language, Some(LANGUAGE_MAX));
    required(&mut errors, "code", &input.code, None);
    tag_lengths(&mut errors, &input.tags);
    errors.into_result()?;

    let mut errors = FieldErrors::default();
    let title = cleaned(&mut errors, "title", input.title.value(), sanitize::text, Some(TITLE_MAX));
    let language = cleaned(&mut errors, "language", input.language.value(), sanitize::text, Some(LANGUAGE_MAX));
    let code = cleaned(&mut errors, "code", input.code.value(), sanitize::code, None);
    let description = cleaned_optional(&mut errors, "description", input.description.value(), DESCRIPTION_MAX);
    let username = cleaned_optional(&mut errors, "username", input.username.value(), USERNAME_MAX);
    let tags = cleaned_tags(&mut errors, input.tags.value());
    errors.into_result()?;

    Ok(Draft {
        title,
        description,
        username,
        language,
        code,
        tags,
    })
}

/// Only keys present in the body become changes. An empty result is left for
/// the caller to reject.
pub fn update(body: &Value) -> AppResult<SnippetChanges> {
    let body = object(body)?;
    let mut errors = FieldErrors::default();
    let input = RawInput::read(body, &mut errors);

    not_null(&mut errors, "title", &input.title, Some(TITLE_MAX));
    optional(&mut errors, "description", &input.description, DESCRIPTION_MAX);
    not_null(&mut errors, "username", &input.username, Some(USERNAME_MAX));
    not_null(&mut errors, "language", &input.language, Some(LANGUAGE_MAX));
    not_null(&mut errors, "code", &input.code, None);
    tag_lengths(&mut errors, &input.tags);
    errors.into_result()?;

    let mut errors = FieldErrors::default();
    let mut changes = SnippetChanges::default();
    if let Field::Value(title) = input.title {
        changes.title = Some(cleaned(&mut errors, "title", Some(title), sanitize::text, Some(TITLE_MAX)));
    }
    if let Field::Value(username) = input.username {
        changes.username = Some(cleaned(&mut errors, "username", Some(username), sanitize::text, Some(USERNAME_MAX)));
    }
    if let Field::Value(language) = input.language {
        changes.language = Some(cleaned(&mut errors, "language", Some(language), sanitize::text, Some(LANGUAGE_MAX)));
    }
    if let Field::Value(code) = input.code {
        changes.code = Some(cleaned(&mut errors, "code", Some(code), sanitize::code, None));
    }
    match input.description {
        Field::Value(description) => {
            changes.description =
                Some(cleaned_optional(&mut errors, "description", Some(description), DESCRIPTION_MAX));
        }
        Field::Null => changes.description = Some(None),
        Field::Missing | Field::Invalid => {}
    }
    match input.tags {
        Field::Value(tags) => changes.tags = Some(cleaned_tags(&mut errors, Some(tags))),
        Field::Null => changes.tags = Some(Vec::new()),
        Field::Missing | Field::Invalid => {}
    }
    errors.into_result()?;

    Ok(changes)
}

fn string_field(body: &Map<String, Value>, name: &str, errors: &mut FieldErrors) -> Field<String> {
    match body.get(name) {
        None => Field::Missing,
        Some(Value::Null) => Field::Null,
        Some(Value::String(s)) => Field::Value(s.clone()),
        Some(_) => {
            errors.add(name, format!("The {name} must be a string."));
            Field::Invalid
        }
    }
}

fn tags_field(body: &Map<String, Value>, errors: &mut FieldErrors) -> Field<Vec<String>> {
    let items = match body.get("tags") {
        None => return Field::Missing,
        Some(Value::Null) => return Field::Null,
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("tags", "The tags must be an array of strings.");
            return Field::Invalid;
        }
    };

    let mut tags = Vec::with_capacity(items.len());
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(tag) => tags.push(tag.to_owned()),
            None => {
                errors.add(format!("tags.{i}"), "Each tag must be a string.");
                valid = false;
            }
        }
    }

    if valid { Field::Value(tags) } else { Field::Invalid }
}

fn required(errors: &mut FieldErrors, name: &str, field: &Field<String>, max: Option<usize>) {
    match field {
        Field::Missing | Field::Null => errors.add(name, format!("The {name} field is required.")),
        Field::Value(value) => length(errors, name, value, true, max),
        Field::Invalid => {}
    }
}

fn not_null(errors: &mut FieldErrors, name: &str, field: &Field<String>, max: Option<usize>) {
    match field {
        Field::Null => errors.add(name, format!("The {name} field cannot be null.")),
        Field::Value(value) => length(errors, name, value, true, max),
        Field::Missing | Field::Invalid => {}
    }
}

fn optional(errors: &mut FieldErrors, name: &str, field: &Field<String>, max: usize) {
    if let Field::Value(value) = field {
        length(errors, name, value, false, Some(max));
    }
}

fn tag_lengths(errors: &mut FieldErrors, tags: &Field<Vec<String>>) {
    if let Field::Value(tags) = tags {
        for (i, tag) in tags.iter().enumerate() {
            length(errors, &format!("tags.{i}"), tag, false, Some(TAG_MAX));
        }
    }
}

fn length(errors: &mut FieldErrors, name: &str, value: &str, non_empty: bool, max: Option<usize>) {
    if non_empty && value.is_empty() {
        errors.add(name, format!("The {name} must not be empty."));
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(name, format!("The {name} may not be greater than {max} characters."));
        }
    }
}

fn cleaned(
    errors: &mut FieldErrors,
    name: &str,
    value: Option<String>,
    clean: fn(&str) -> String,
    max: Option<usize>,
) -> String {
    let value = clean(value.as_deref().unwrap_or_default());
    if value.is_empty() {
        errors.add(name, format!("The {name} must contain text after removing markup."));
    } else {
        length(errors, name, &value, true, max);
    }
    value
}

fn cleaned_optional(errors: &mut FieldErrors, name: &str, value: Option<String>, max: usize) -> Option<String> {
    let value = sanitize::text(&value?);
    if value.is_empty() {
        return None;
    }
    length(errors, name, &value, false, Some(max));
    Some(value)
}

fn cleaned_tags(errors: &mut FieldErrors, tags: Option<Vec<String>>) -> Vec<String> {
    let tags: Vec<String> = tags
        .unwrap_or_default()
        .iter()
        .map(|tag| sanitize::text(tag))
        .filter(|tag| !tag.is_empty())
        .collect();
    for (i, tag) in tags.iter().enumerate() {
        length(errors, &format!("tags.{i}"), tag, true, Some(TAG_MAX));
    }
    tags
}
