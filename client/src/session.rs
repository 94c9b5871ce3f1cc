//! Authenticated session collaborator
//!
//! A session supplies the auth header every binding attaches and the
//! per-zone endpoints zone-scoped providers resolve paths against. How the
//! token was obtained (login, config) is not the bindings' concern.

use std::collections::{BTreeMap, BTreeSet};

pub const NOVA_AUTH_HEADER: &str = "X-Auth-Token";
pub const VCLOUD_AUTH_HEADER: &str = "x-vcloud-authorization";

pub trait Session: Send + Sync {
    /// Header name and value identifying this session.
    fn auth_header(&self) -> (&str, &str);

    /// Base URL for a zone, without trailing slash.
    fn endpoint(&self, zone: &str) -> Option<&str>;

    fn zones(&self) -> BTreeSet<String>;
}

/// Session with a fixed token and endpoint table.
#[derive(Debug, Clone)]
pub struct StaticSession {
    header_name: String,
    token: String,
    endpoints: BTreeMap<String, String>,
}

impl StaticSession {
    pub fn new(header_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            token: token.into(),
            endpoints: BTreeMap::new(),
        }
    }

    pub fn with_endpoint(mut self, zone: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert_endpoint(zone, url);
        self
    }

    pub fn insert_endpoint(&mut self, zone: impl Into<String>, url: impl Into<String>) {
        let url: String = url.into();
        self.endpoints
            .insert(zone.into(), url.trim_end_matches('/').to_string());
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Session for StaticSession {
    fn auth_header(&self) -> (&str, &str) {
        (&self.header_name, &self.token)
    }

    fn endpoint(&self, zone: &str) -> Option<&str> {
        self.endpoints.get(zone).map(String::as_str)
    }

    fn zones(&self) -> BTreeSet<String> {
        self.endpoints.keys().cloned().collect()
    }
}
