//! Required caller-identity headers and their validation.

use crate::error::FieldErrors;
use axum::http::HeaderMap;

pub const TRACER_UID_HEADER: &str = "tracer_uid";
pub const USER_UID_HEADER: &str = "user_uid";
pub const SITE_UID_HEADER: &str = "site_uid";
pub const ORG_UID_HEADER: &str = "org_uid";

/// Raw header values; empty strings when absent.
#[derive(Clone, Debug, Default)]
pub struct RequiredHeaders {
    pub tracer_uid: String,
    pub user_uid: String,
    pub site_uid: String,
    pub org_uid: String,
}

impl RequiredHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        RequiredHeaders {
            tracer_uid: get(TRACER_UID_HEADER),
            user_uid: get(USER_UID_HEADER),
            site_uid: get(SITE_UID_HEADER),
            org_uid: get(ORG_UID_HEADER),
        }
    }

    /// `tracer_uid`, `user_uid` and `site_uid` must be UUID v4; `org_uid` may
    /// be empty but must be UUID v4 when set.
    pub fn check(&self) -> FieldErrors {
        let mut fe = FieldErrors::new();
        for (name, value) in [
            (TRACER_UID_HEADER, &self.tracer_uid),
            (USER_UID_HEADER, &self.user_uid),
            (SITE_UID_HEADER, &self.site_uid),
        ] {
            if value.is_empty() {
                fe.add(name, "required");
            } else if !is_uuid4(value) {
                fe.add(name, "uuid4");
            }
        }
        if !self.org_uid.is_empty() && !is_uuid4(&self.org_uid) {
            fe.add(ORG_UID_HEADER, "uuid4");
        }
        fe
    }
}

fn is_uuid4(s: &str) -> bool {
    uuid::Uuid::parse_str(s)
        .map(|u| u.get_version_num() == 4)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const V4: &str = "9b2f7c1e-0d4a-4f5e-8c3b-1a2d3e4f5a6b";

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn complete_set_passes() {
        let h = headers(&[(TRACER_UID_HEADER, V4), (USER_UID_HEADER, V4), (SITE_UID_HEADER, V4)]);
        assert!(RequiredHeaders::from_headers(&h).check().is_empty());
    }

    #[test]
    fn missing_tracer_is_required() {
        let h = headers(&[(USER_UID_HEADER, V4), (SITE_UID_HEADER, V4)]);
        let fe = RequiredHeaders::from_headers(&h).check();
        assert_eq!(fe.fields().get(TRACER_UID_HEADER).map(String::as_str), Some("required"));
        assert_eq!(fe.fields().len(), 1);
    }

    #[test]
    fn non_v4_uuid_is_rejected() {
        // version 1 uuid
        let v1 = "c232ab00-9414-11ec-b3c8-9f6bdeced846";
        let h = headers(&[
            (TRACER_UID_HEADER, V4),
            (USER_UID_HEADER, v1),
            (SITE_UID_HEADER, V4),
            (ORG_UID_HEADER, "nope"),
        ]);
        let fe = RequiredHeaders::from_headers(&h).check();
        assert_eq!(fe.fields().get(USER_UID_HEADER).map(String::as_str), Some("uuid4"));
        assert_eq!(fe.fields().get(ORG_UID_HEADER).map(String::as_str), Some("uuid4"));
    }
}
