//! Persisted session types

use serde::{Deserialize, Serialize};

/// One browser cookie in a form that survives a round trip through disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the Unix epoch; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            http_only: false,
            secure: false,
            session: true,
            same_site: None,
        }
    }
}

/// Opaque set of credentials captured after a successful login
///
/// Stored on disk as a JSON array of cookies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    cookies: Vec<SessionCookie>,
}

impl Session {
    #[must_use]
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self { cookies }
    }

    #[must_use]
    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    #[must_use]
    pub fn into_cookies(self) -> Vec<SessionCookie> {
        self.cookies
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl From<Vec<SessionCookie>> for Session {
    fn from(cookies: Vec<SessionCookie>) -> Self {
        Self::new(cookies)
    }
}
