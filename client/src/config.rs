use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::monitor::PollPolicy;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    pub nova: Option<NovaConfig>,
    pub vcloud: Option<VcloudConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            verify_ssl: default_verify_ssl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_initial_interval")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
    #[serde(default = "default_backoff")]
    pub backoff: f64,
    /// Overrides the ceiling each operation category declares.
    pub timeout_seconds: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval(),
            max_interval_ms: default_max_interval(),
            backoff: default_backoff(),
            timeout_seconds: None,
        }
    }
}

impl PollingConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            backoff: self.backoff,
            timeout: self.timeout_seconds.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NovaConfig {
    #[serde(rename = "auth")]
    pub auth_type: NovaAuthType,
    pub keystone: Option<KeystoneConfig>,
    pub token: Option<TokenConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NovaAuthType {
    Keystone,
    Token,
}

#[derive(Debug, Deserialize)]
pub struct KeystoneConfig {
    pub identity_url: String,
    pub username: String,
    pub password: String,
    pub tenant_name: String,
    #[serde(default = "default_service_type")]
    pub service_type: String,
}

/// Pre-issued token with explicit per-zone compute endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    #[serde(default)]
    pub zones: BTreeMap<String, String>,
}

impl NovaConfig {
    pub fn get_keystone(&self) -> Option<&KeystoneConfig> {
        match self.auth_type {
            NovaAuthType::Keystone => self.keystone.as_ref(),
            _ => None,
        }
    }

    pub fn get_token(&self) -> Option<&TokenConfig> {
        match self.auth_type {
            NovaAuthType::Token => self.token.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VcloudConfig {
    /// API root, e.g. https://vcloud.example.com/api
    pub endpoint: String,
    pub username: Option<String>,
    pub org: Option<String>,
    pub password: Option<String>,
    /// Existing x-vcloud-authorization token; skips the session login.
    pub token: Option<String>,
}

pub enum VcloudAuth<'a> {
    Token(&'a str),
    Login {
        username: &'a str,
        org: &'a str,
        password: &'a str,
    },
}

impl VcloudConfig {
    pub fn auth(&self) -> Result<VcloudAuth<'_>> {
        if let Some(token) = &self.token {
            return Ok(VcloudAuth::Token(token));
        }
        match (&self.username, &self.org, &self.password) {
            (Some(username), Some(org), Some(password)) => Ok(VcloudAuth::Login {
                username,
                org,
                password,
            }),
            _ => bail!("[vcloud] needs either token or username, org and password"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(nova) = &self.nova {
            if nova.get_keystone().is_none() && nova.get_token().is_none() {
                bail!(
                    "[nova] auth = \"{}\" requires a matching [nova.{}] section",
                    match nova.auth_type {
                        NovaAuthType::Keystone => "keystone",
                        NovaAuthType::Token => "token",
                    },
                    match nova.auth_type {
                        NovaAuthType::Keystone => "keystone",
                        NovaAuthType::Token => "token",
                    }
                );
            }
        }
        if !self.polling.backoff.is_finite() || self.polling.backoff < 1.0 {
            bail!(
                "[polling] backoff must be a finite number of at least 1.0, got {}",
                self.polling.backoff
            );
        }
        if self.polling.initial_interval_ms == 0 {
            bail!("[polling] initial_interval_ms must be positive");
        }
        Ok(())
    }
}

// Default functions
fn default_request_timeout() -> u64 {
    30
}

fn default_verify_ssl() -> bool {
    true
}

fn default_initial_interval() -> u64 {
    1000
}

fn default_max_interval() -> u64 {
    5000
}

fn default_backoff() -> f64 {
    1.5
}

fn default_service_type() -> String {
    "compute".to_string()
}
