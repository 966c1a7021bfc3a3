use crate::error::{GateError, Result};
use std::fmt;
use std::time::Duration;

pub const PASSWORD_ENV: &str = "EXCHANGE_GATE_PASSWORD";
pub const SECRET_ENV: &str = "EXCHANGE_GATE_SECRET";
pub const COOKIE_NAME_ENV: &str = "EXCHANGE_GATE_COOKIE";

pub const DEFAULT_COOKIE_NAME: &str = "xg_gate";
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deployment-wide gate settings. Read-only once the server starts.
#[derive(Clone)]
pub struct GateConfig {
    expected_password: Option<String>,
    signing_secret: Option<String>,
    pub cookie_name: String,
    pub ttl: Duration,
}

impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("expected_password", &self.expected_password.as_ref().map(|_| "<redacted>"))
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<redacted>"))
            .field("cookie_name", &self.cookie_name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl GateConfig {
    /// Blank values count as unset.
    pub fn new(expected_password: Option<&str>, signing_secret: Option<&str>) -> Self {
        Self {
            expected_password: non_blank(expected_password),
            signing_secret: non_blank(signing_secret),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            ttl: TOKEN_TTL,
        }
    }

    pub fn from_env() -> Self {
        let password = std::env::var(PASSWORD_ENV).ok();
        let secret = std::env::var(SECRET_ENV).ok();
        let mut config = Self::new(password.as_deref(), secret.as_deref());
        if let Some(name) = std::env::var(COOKIE_NAME_ENV)
            .ok()
            .filter(|name| is_valid_cookie_name(name))
        {
            config.cookie_name = name;
        }
        config
    }

    pub fn with_cookie_name(mut self, name: &str) -> Self {
        if is_valid_cookie_name(name) {
            self.cookie_name = name.to_string();
        } else {
            log::warn!("ignoring invalid gate cookie name {name:?}");
        }
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn signing_secret(&self) -> Result<&str> {
        self.signing_secret
            .as_deref()
            .ok_or(GateError::Misconfigured {
                missing: SECRET_ENV,
            })
    }

    pub fn expected_password(&self) -> Result<&str> {
        self.expected_password
            .as_deref()
            .ok_or(GateError::Misconfigured {
                missing: PASSWORD_ENV,
            })
    }

    pub fn is_complete(&self) -> bool {
        self.expected_password.is_some() && self.signing_secret.is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// RFC 6265 token characters only.
fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_fail_closed() {
        let config = GateConfig::new(Some("  "), Some("secret"));
        assert_eq!(
            config.expected_password(),
            Err(GateError::Misconfigured {
                missing: PASSWORD_ENV
            })
        );
        assert!(!config.is_complete());

        let config = GateConfig::new(Some("pw"), None);
        assert_eq!(
            config.signing_secret(),
            Err(GateError::Misconfigured { missing: SECRET_ENV })
        );
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let config = GateConfig::new(Some("hunter2"), Some("topsecret"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn rejects_cookie_names_with_separators() {
        let config = GateConfig::new(Some("pw"), Some("s")).with_cookie_name("bad name;");
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        let config = GateConfig::new(Some("pw"), Some("s")).with_cookie_name("site_gate");
        assert_eq!(config.cookie_name, "site_gate");
    }
}
