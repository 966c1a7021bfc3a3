//! # Exchange Gate
//!
//! Password gate for the whole site. A correct password earns an HMAC-SHA256 signed
//! token with a 24 hour expiry, stored in an HttpOnly cookie and checked on every
//! protected request.
//!
//! ```text
//! POST /gate/login ──> constant-time password check ──> sign "exp=<ts>" ──> Set-Cookie + redirect
//!
//! request ──> public path? ──yes──> serve
//!                 │no
//!                 └──> edge verifier (interceptor) ──> page guard (server verifier) ──> serve
//!                            │denied                        │denied
//!                            └──────────> 303 /gate?next=<sanitized path>
//! ```
//!
//! Verification is split in two steps: a verifier checks signature and shape and
//! returns `exp`; [`Gate::authorize`] and [`Gate::authorize_edge`] add the expiry
//! check. Guards should always go through the `Gate`.

mod attempts;
mod config;
mod cookie;
mod error;
mod events;
mod gate;
mod password;
mod public_paths;
mod redirect;
mod token;
mod verifier;

pub use attempts::{LoginAttempts, ASSISTANCE_THRESHOLD};
pub use config::{
    GateConfig, COOKIE_NAME_ENV, DEFAULT_COOKIE_NAME, PASSWORD_ENV, SECRET_ENV, TOKEN_TTL,
};
pub use cookie::{cleared_cookie, find_cookie, session_cookie};
pub use error::{GateError, Result};
pub use events::{normalize_country, GateEvent, GateEventSink, LogEventSink, COUNTRY_HEADERS};
pub use gate::{Access, Gate, LoginAttempt, LoginSuccess};
pub use password::passwords_match;
pub use public_paths::{PublicPaths, GATE_PATH};
pub use redirect::{is_safe_next_path, safe_next_path};
pub use token::{encode_payload, unix_now, IssuedToken, Verified};
pub use verifier::{Backend, EdgeVerifier, ServerVerifier, TokenVerifier};
