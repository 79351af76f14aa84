//! Field-level input checks collected into a single `Validation` error.

use crate::error::{DomainError, FieldErrors};

/// Accumulates field failures; the first message recorded per field wins.
#[derive(Debug, Default)]
pub struct FieldValidator {
    errors: FieldErrors,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, msg: String) {
        self.errors.entry(field.to_string()).or_insert(msg);
    }

    /// Non-blank text with a character count in `1..=max`.
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "must not be blank".to_string());
        } else {
            self.max_chars(field, value, max);
        }
        self
    }

    /// Same as `required_text`, but only when the field is present.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            self.required_text(field, v, max);
        }
        self
    }

    fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.fail(field, format!("must be at most {max} characters"));
        }
    }

    /// Non-blank, syntactically plausible email (`local@domain.tld`).
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "must not be blank".to_string());
        } else if !looks_like_email(value.trim()) {
            self.fail(field, "must be a well-formed email address".to_string());
        }
        self
    }

    pub fn optional_email(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.email(field, v);
        }
        self
    }

    /// Non-blank secret; length is not bounded here.
    pub fn secret(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "must not be blank".to_string());
        }
        self
    }

    pub fn optional_secret(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.secret(field, v);
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), DomainError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
