//! Request validation contracts.
//!
//! Every create/update body implements [`Validate`]. Rules mirror the
//! database constraints so that bad input is rejected with a 422 and a
//! per-field message before any query runs.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of short text fields (titles, names).
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of long text fields (descriptions, prompts).
pub const MAX_TEXT_LEN: usize = 10_000;

/// Collected field errors, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for a field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` if nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// A request body that can check itself.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Required string: non-blank and at most `max` characters.
pub fn required_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.add(field, "must not be blank");
    } else if value.chars().count() > max {
        errors.add(field, format!("must be at most {} characters", max));
    }
}

/// Optional string: if present, same rules as [`required_text`].
pub fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        required_text(errors, field, v, max);
    }
}

/// Minimal email shape check: `local@domain.tld`.
pub fn email(errors: &mut ValidationErrors, field: &str, value: &str) {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add(field, "must be a valid email address");
    }
}

/// Lowercase ASCII letters, digits and single hyphens.
pub fn slug(errors: &mut ValidationErrors, field: &str, value: &str) {
    let valid = !value.is_empty()
        && value.len() <= 100
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        errors.add(field, "must contain only lowercase letters, digits and hyphens");
    }
}

/// Percent bounds check.
pub fn percent(errors: &mut ValidationErrors, field: &str, value: i32) {
    if !(0..=100).contains(&value) {
        errors.add(field, "must be between 0 and 100");
    }
}

/// Non-negative integer check.
pub fn non_negative(errors: &mut ValidationErrors, field: &str, value: i64) {
    if value < 0 {
        errors.add(field, "must not be negative");
    }
}

/// Locale tag: `en` or `en-US`.
pub fn locale(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_locale(value) {
        errors.add(field, "must be a locale like 'en' or 'es-MX'");
    }
}

pub fn is_locale(value: &str) -> bool {
    let mut parts = value.split('-');
    let lang_ok = parts
        .next()
        .map(|l| l.len() == 2 && l.chars().all(|c| c.is_ascii_lowercase()))
        .unwrap_or(false);
    let region_ok = match parts.next() {
        Some(r) => r.len() == 2 && r.chars().all(|c| c.is_ascii_uppercase()),
        None => true,
    };
    lang_ok && region_ok && parts.next().is_none()
}

/// Value must be one of `allowed`.
pub fn one_of(errors: &mut ValidationErrors, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        errors.add(field, format!("must be one of: {}", allowed.join(", ")));
    }
}

/// Partial updates must change something.
pub fn at_least_one(errors: &mut ValidationErrors, present: &[bool]) {
    if !present.iter().any(|p| *p) {
        errors.add("body", "at least one field must be provided");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        let mut errors = ValidationErrors::new();
        required_text(&mut errors, "title", "   ", 10);
        required_text(&mut errors, "name", "abcdefghijk", 10);
        required_text(&mut errors, "ok", "Forklift Safety", 100);
        assert_eq!(errors.get("title").unwrap()[0], "must not be blank");
        assert!(errors.get("name").unwrap()[0].contains("at most 10"));
        assert!(errors.get("ok").is_none());
    }

    #[test]
    fn test_email() {
        let check = |v: &str| {
            let mut e = ValidationErrors::new();
            email(&mut e, "email", v);
            e.is_empty()
        };
        assert!(check("jane.doe@specchem.com"));
        assert!(!check("jane.doe"));
        assert!(!check("@specchem.com"));
        assert!(!check("jane@localhost"));
        assert!(!check("jane@@specchem.com"));
        assert!(!check("jane doe@specchem.com"));
    }

    #[test]
    fn test_slug() {
        let check = |v: &str| {
            let mut e = ValidationErrors::new();
            slug(&mut e, "slug", v);
            e.is_empty()
        };
        assert!(check("lockout-tagout-101"));
        assert!(!check("Lockout"));
        assert!(!check("-leading"));
        assert!(!check("double--hyphen"));
        assert!(!check(""));
    }

    #[test]
    fn test_locale() {
        assert!(is_locale("en"));
        assert!(is_locale("es-MX"));
        assert!(!is_locale("english"));
        assert!(!is_locale("es-mx"));
        assert!(!is_locale("es-MX-x"));
    }

    #[test]
    fn test_display_and_into_result() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());
        percent(&mut errors, "progress_percent", 120);
        one_of(&mut errors, "role", "root", &["hr_admin", "dev_admin"]);
        let text = errors.to_string();
        assert!(text.contains("progress_percent: must be between 0 and 100"));
        assert!(text.contains("role: must be one of: hr_admin, dev_admin"));
        assert!(errors.into_result().is_err());
    }
}
