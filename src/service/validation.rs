//! Input validation rules. Failures are collected per field and returned
//! together as [`AppError::Validation`].

use crate::error::{AppError, FieldErrors};
use regex::Regex;
use std::sync::OnceLock;

/// Lowercase alphanumeric words joined by single hyphens.
pub fn is_slug(s: &str) -> bool {
    static SLUG: OnceLock<Option<Regex>> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// Positive integer primary key.
pub fn check_id(id: &str) -> Option<i64> {
    id.trim().parse::<i64>().ok().filter(|n| *n > 0)
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present and not empty. Returns the value for further rules.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.errors.add(field, "required");
                None
            }
        }
    }

    /// Required integer field.
    pub fn required_id(&mut self, field: &str, value: Option<i64>) -> Option<i64> {
        match value {
            Some(v) if v > 0 => Some(v),
            Some(_) => {
                self.errors.add(field, "id");
                None
            }
            None => {
                self.errors.add(field, "required");
                None
            }
        }
    }

    pub fn slug(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_slug(value) {
            self.errors.add(field, "slug");
        }
        self
    }

    pub fn notblank(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.add(field, "notblank");
        }
        self
    }

    /// Apply `rule` when the optional field was sent. An explicit empty
    /// value still has to pass `required`.
    pub fn optional<F>(&mut self, field: &str, value: Option<&str>, rule: F) -> &mut Self
    where
        F: FnOnce(&mut Self, &str, &str),
    {
        if let Some(v) = value {
            if let Some(v) = self.required(field, Some(v)) {
                rule(self, field, v);
            }
        }
        self
    }

    pub fn finish(self) -> Result<(), AppError> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert!(is_slug("in-progress"));
        assert!(is_slug("v2"));
        assert!(!is_slug("In Progress"));
        assert!(!is_slug("-lead"));
        assert!(!is_slug("double--dash"));
        assert!(!is_slug(""));
    }

    #[test]
    fn ids() {
        assert_eq!(check_id("42"), Some(42));
        assert_eq!(check_id("0"), None);
        assert_eq!(check_id("abc"), None);
    }

    #[test]
    fn missing_label_is_required() {
        let mut v = Validator::new();
        if let Some(label) = v.required("label", None) {
            v.slug("label", label);
        }
        if let Some(sha) = v.required("commit_sha", Some("   ")) {
            v.notblank("commit_sha", sha);
        }
        match v.finish().unwrap_err() {
            AppError::Validation(fe) => {
                assert_eq!(fe.fields().get("label").map(String::as_str), Some("required"));
                assert_eq!(fe.fields().get("commit_sha").map(String::as_str), Some("notblank"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn optional_fields_only_checked_when_sent() {
        let mut v = Validator::new();
        v.optional("alias", None, |v, f, s| {
            v.slug(f, s);
        })
        .optional("name", Some(""), |v, f, s| {
            v.notblank(f, s);
        });
        let err = v.finish().unwrap_err();
        let AppError::Validation(fe) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fe.fields().len(), 1);
        assert_eq!(fe.fields().get("name").map(String::as_str), Some("required"));
    }
}
