//! Request validation on top of the `validator` crate.
//!
//! Request structs derive `Deserialize` and `validator::Validate`.
//! [`ValidJson`] runs both as an axum extractor and renders failures as a
//! field-keyed [`FieldErrors`] body.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Field key used when the body itself could not be parsed.
pub const BODY_FIELD: &str = "body";

pub const REQUIRED: &str = "This field is required.";

/// Field-keyed validation messages, one message per field.
///
/// Nested objects are flattened into dotted keys such as
/// `verification_data.session`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for `field`. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let key = match prefix {
                Some(prefix) => format!("{prefix}.{field}"),
                None => field.to_string(),
            };
            match kind {
                ValidationErrorsKind::Field(list) => {
                    if let Some(first) = list.first() {
                        self.add(key, message_for(first));
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(Some(&key), nested),
                ValidationErrorsKind::List(items) => {
                    for (index, nested) in items {
                        self.collect(Some(&format!("{key}.{index}")), nested);
                    }
                }
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Self::new();
        fields.collect(None, &errors);
        fields
    }
}

/// Client-facing text for one failed rule.
///
/// An explicit `message` on the rule wins. Otherwise `required` and `length`
/// get their standard wording and anything else falls back to the rule code.
pub fn message_for(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "required" => REQUIRED.to_owned(),
        "length" => length_message(error),
        code => format!("Invalid value ({code})."),
    }
}

fn length_message(error: &ValidationError) -> String {
    let bound = |name: &str| error.params.get(name).and_then(serde_json::Value::as_u64);
    let len = error
        .params
        .get("value")
        .and_then(serde_json::Value::as_str)
        .map(|value| value.chars().count() as u64);
    match (bound("min"), bound("max"), len) {
        (Some(min), _, Some(len)) if len < min => {
            format!("Ensure this field has at least {min} characters.")
        }
        (_, Some(max), _) => format!("Ensure this field has no more than {max} characters."),
        (Some(min), None, _) => format!("Ensure this field has at least {min} characters."),
        _ => "Invalid length.".to_owned(),
    }
}

impl IntoResponse for FieldErrors {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "kind": "INVALID_REQUEST",
            "message": "invalid request",
            "fields": self,
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Extractor that parses a JSON body as `T` and runs its validation rules.
///
/// Both unparseable JSON and failed rules are rejected with 400 and a
/// [`FieldErrors`] body.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: Validate + DeserializeOwned,
{
    type Rejection = FieldErrors;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| FieldErrors::single(BODY_FIELD, rejection.body_text()))?;
        raw.validate()?;
        Ok(ValidJson(raw))
    }
}
