use crate::config::GateConfig;
use crate::cookie;
use crate::error::{GateError, Result};
use crate::events::{GateEvent, GateEventSink, LogEventSink};
use crate::password::passwords_match;
use crate::public_paths::PublicPaths;
use crate::redirect::safe_next_path;
use crate::token::{IssuedToken, Verified};
use crate::verifier::{EdgeVerifier, ServerVerifier, TokenVerifier};
use std::sync::Arc;

/// Authorization decision for one request. Deliberately carries no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted { exp: u64 },
    Denied,
}

impl Access {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoginAttempt<'a> {
    pub password: &'a str,
    pub next: Option<&'a str>,
    pub country: Option<&'a str>,
}

/// Everything the login action must apply together: cookie and redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub set_cookie: String,
    pub redirect_to: String,
    pub expires_at: u64,
}

/// The site's password gate: login, logout and per-request authorization.
#[derive(Clone)]
pub struct Gate {
    config: GateConfig,
    server: Option<ServerVerifier>,
    edge: Option<EdgeVerifier>,
    public: PublicPaths,
    sink: Arc<dyn GateEventSink>,
}

impl Gate {
    pub fn new(config: GateConfig) -> Self {
        let (server, edge) = match config.signing_secret() {
            Ok(secret) => match ServerVerifier::new(secret) {
                Ok(server) => (Some(server), Some(EdgeVerifier::new(secret))),
                Err(err) => {
                    log::error!("gate signing key rejected: {err}");
                    (None, None)
                }
            },
            Err(err) => {
                log::warn!("{err}; every protected request will be denied");
                (None, None)
            }
        };
        if config.expected_password().is_err() {
            log::warn!("gate password is not configured; logins will fail closed");
        }

        Self {
            config,
            server,
            edge,
            public: PublicPaths::default(),
            sink: Arc::new(LogEventSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn GateEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_public_paths(mut self, public: PublicPaths) -> Self {
        self.public = public;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.is_public(path)
    }

    /// Check the password and, on a match, mint the cookie and redirect target.
    ///
    /// Nothing is produced on failure, so a caller can never set a partial cookie.
    /// Every attempt emits exactly one [`GateEvent`].
    pub fn login(&self, attempt: LoginAttempt<'_>, now: u64) -> Result<LoginSuccess> {
        let outcome = self.try_login(&attempt, now);
        self.sink
            .record(&GateEvent::now(attempt.country, outcome.is_ok()));
        match &outcome {
            Ok(success) => log::debug!("gate login accepted, redirecting to {}", success.redirect_to),
            Err(GateError::InvalidPassword) => log::debug!("gate login rejected"),
            Err(err) => log::error!("gate login failed closed: {err}"),
        }
        outcome
    }

    fn try_login(&self, attempt: &LoginAttempt<'_>, now: u64) -> Result<LoginSuccess> {
        let expected = self.config.expected_password()?;
        self.config.signing_secret()?;
        if !passwords_match(attempt.password, expected) {
            return Err(GateError::InvalidPassword);
        }
        let issued = self.issue_token(now)?;
        Ok(LoginSuccess {
            set_cookie: cookie::session_cookie(
                &self.config.cookie_name,
                &issued.value,
                self.config.ttl,
            ),
            redirect_to: safe_next_path(attempt.next),
            expires_at: issued.exp,
        })
    }

    /// Sign a token that expires one TTL after `now`.
    pub fn issue_token(&self, now: u64) -> Result<IssuedToken> {
        self.config.signing_secret()?;
        let server = self
            .server
            .as_ref()
            .ok_or_else(|| GateError::InvalidKey("signing key unavailable".to_string()))?;
        Ok(server.issue(now.saturating_add(self.config.ttl.as_secs())))
    }

    pub fn logout_cookie(&self) -> String {
        cookie::cleared_cookie(&self.config.cookie_name)
    }

    /// Page-guard check on the synchronous backend: signature, then expiry.
    pub fn authorize(&self, token: Option<&str>, now: u64) -> Access {
        let (Some(server), Some(token)) = (self.server.as_ref(), token) else {
            return Access::Denied;
        };
        decide(server.verify_now(token), now)
    }

    /// Interceptor check on the edge backend: signature, then expiry.
    pub async fn authorize_edge(&self, token: Option<&str>, now: u64) -> Access {
        let (Some(edge), Some(token)) = (self.edge.as_ref(), token) else {
            return Access::Denied;
        };
        decide(edge.verify(token).await, now)
    }

    /// Convenience for a raw `Cookie` header.
    pub fn token_from_cookie_header<'a>(&self, header: Option<&'a str>) -> Option<&'a str> {
        header
            .and_then(|h| cookie::find_cookie(h, &self.config.cookie_name))
            .filter(|value| !value.is_empty())
    }
}

fn decide(verified: Option<Verified>, now: u64) -> Access {
    match verified {
        Some(verified) if verified.is_live(now) => Access::Granted { exp: verified.exp },
        _ => Access::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PASSWORD_ENV, SECRET_ENV};
    use std::sync::Mutex;

    const NOW: u64 = 1_750_000_000;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<GateEvent>>,
    }

    impl GateEventSink for RecordingSink {
        fn record(&self, event: &GateEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn gate_with_sink() -> (Gate, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let gate = Gate::new(GateConfig::new(Some("open sesame"), Some("s3cret")))
            .with_sink(sink.clone());
        (gate, sink)
    }

    fn token_from(set_cookie: &str) -> &str {
        let value = set_cookie.split(';').next().unwrap();
        value.split_once('=').unwrap().1
    }

    #[test]
    fn correct_password_sets_cookie_and_redirects() {
        let (gate, sink) = gate_with_sink();
        let success = gate
            .login(
                LoginAttempt {
                    password: "open sesame",
                    next: Some("/brands"),
                    country: Some("de"),
                },
                NOW,
            )
            .unwrap();

        assert_eq!(success.redirect_to, "/brands");
        assert_eq!(success.expires_at, NOW + 86_400);
        assert!(success.set_cookie.starts_with("xg_gate="));
        assert!(success.set_cookie.contains("HttpOnly"));
        assert!(success.set_cookie.contains("Max-Age=86400"));

        let access = gate.authorize(Some(token_from(&success.set_cookie)), NOW + 10);
        assert_eq!(access, Access::Granted { exp: NOW + 86_400 });

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].success);
        assert_eq!(events[0].country.as_deref(), Some("DE"));
    }

    #[test]
    fn unsafe_next_is_sanitized_on_success() {
        let (gate, _) = gate_with_sink();
        let success = gate
            .login(
                LoginAttempt {
                    password: "open sesame",
                    next: Some("//evil.com"),
                    country: None,
                },
                NOW,
            )
            .unwrap();
        assert_eq!(success.redirect_to, "/");
    }

    #[test]
    fn wrong_password_issues_nothing() {
        let (gate, sink) = gate_with_sink();
        let err = gate
            .login(
                LoginAttempt {
                    password: "guess",
                    next: Some("/brands"),
                    country: None,
                },
                NOW,
            )
            .unwrap_err();
        assert_eq!(err, GateError::InvalidPassword);
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].success);
    }

    #[test]
    fn missing_configuration_fails_closed() {
        let gate = Gate::new(GateConfig::new(None, Some("s3cret")));
        let err = gate
            .login(
                LoginAttempt {
                    password: "",
                    ..Default::default()
                },
                NOW,
            )
            .unwrap_err();
        assert_eq!(
            err,
            GateError::Misconfigured {
                missing: PASSWORD_ENV
            }
        );

        let gate = Gate::new(GateConfig::new(Some("open sesame"), None));
        let err = gate
            .login(
                LoginAttempt {
                    password: "open sesame",
                    ..Default::default()
                },
                NOW,
            )
            .unwrap_err();
        assert_eq!(err, GateError::Misconfigured { missing: SECRET_ENV });
        assert_eq!(gate.authorize(Some("anything.at-all"), NOW), Access::Denied);
    }

    #[test]
    fn expired_token_verifies_but_is_denied() {
        let (gate, _) = gate_with_sink();
        let issued = gate.issue_token(NOW - 2 * 86_400).unwrap();
        let server = ServerVerifier::new("s3cret").unwrap();
        assert!(server.verify_now(&issued.value).is_some());
        assert_eq!(gate.authorize(Some(&issued.value), NOW), Access::Denied);
    }

    #[tokio::test]
    async fn edge_and_server_guards_agree() {
        let (gate, _) = gate_with_sink();
        let live = gate.issue_token(NOW).unwrap().value;
        let expired = gate.issue_token(NOW - 90_000).unwrap().value;
        for token in [Some(live.as_str()), Some(expired.as_str()), Some("x.y"), None] {
            assert_eq!(
                gate.authorize(token, NOW),
                gate.authorize_edge(token, NOW).await
            );
        }
        assert!(gate.authorize_edge(Some(&live), NOW).await.is_granted());
    }

    #[test]
    fn secret_rotation_invalidates_tokens() {
        let (gate, _) = gate_with_sink();
        let token = gate.issue_token(NOW).unwrap().value;
        let rotated = Gate::new(GateConfig::new(Some("open sesame"), Some("new-secret")));
        assert_eq!(rotated.authorize(Some(&token), NOW), Access::Denied);
    }

    #[test]
    fn reads_token_from_cookie_header() {
        let (gate, _) = gate_with_sink();
        assert_eq!(
            gate.token_from_cookie_header(Some("a=1; xg_gate=tok.sig")),
            Some("tok.sig")
        );
        assert_eq!(gate.token_from_cookie_header(Some("xg_gate=")), None);
        assert_eq!(gate.token_from_cookie_header(None), None);
        assert!(gate.logout_cookie().contains("Max-Age=0"));
    }
}
