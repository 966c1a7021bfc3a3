//! Token wire format: `base64url(payload) "." base64url(signature)`.
//!
//! The payload is the text `exp=<unix seconds>`. The signature is HMAC-SHA256 over
//! the encoded payload segment, so verifiers never have to re-encode anything before
//! checking it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::{SystemTime, UNIX_EPOCH};

const MAX_TOKEN_CHARS: usize = 1_024;

static EXP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|&)exp=(\d+)(?:&|$)").expect("exp regex is valid"));

/// Result of a successful signature check. The caller still has to compare `exp`
/// against the clock; see [`Verified::is_live`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub exp: u64,
}

impl Verified {
    pub fn is_live(&self, now: u64) -> bool {
        self.exp > now
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub exp: u64,
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn encode_payload(exp: u64) -> String {
    URL_SAFE_NO_PAD.encode(format!("exp={exp}"))
}

pub fn encode_signature(signature: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(signature)
}

pub fn assemble(payload_segment: &str, signature: &[u8]) -> String {
    format!("{payload_segment}.{}", encode_signature(signature))
}

/// Payload segment and decoded signature bytes, or `None` when the shape is wrong.
pub(crate) fn split(token: &str) -> Option<(&str, Vec<u8>)> {
    if token.len() > MAX_TOKEN_CHARS {
        return None;
    }
    let (payload, signature) = token.split_once('.')?;
    if payload.is_empty() || signature.is_empty() {
        return None;
    }
    let signature = URL_SAFE_NO_PAD.decode(signature.as_bytes()).ok()?;
    Some((payload, signature))
}

/// Decode the payload segment and pull out `exp`.
pub(crate) fn extract_exp(payload_segment: &str) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(payload_segment.as_bytes()).ok()?;
    let text = std::str::from_utf8(&bytes).ok()?;
    let captures = EXP_RE.captures(text)?;
    captures.get(1)?.as_str().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_encodes_exp_text() {
        let segment = encode_payload(1_700_000_000);
        let decoded = URL_SAFE_NO_PAD.decode(segment.as_bytes()).unwrap();
        assert_eq!(decoded, b"exp=1700000000");
        assert_eq!(extract_exp(&segment), Some(1_700_000_000));
    }

    #[test]
    fn split_requires_both_segments() {
        assert!(split("").is_none());
        assert!(split("abc").is_none());
        assert!(split(".abc").is_none());
        assert!(split("abc.").is_none());
        assert!(split("abc.!!!").is_none());
        let (payload, sig) = split("abc.AAEC").unwrap();
        assert_eq!(payload, "abc");
        assert_eq!(sig, vec![0, 1, 2]);
    }

    #[test]
    fn exp_must_be_numeric_and_in_range() {
        let garbage = URL_SAFE_NO_PAD.encode("exp=soon");
        assert_eq!(extract_exp(&garbage), None);
        let missing = URL_SAFE_NO_PAD.encode("iat=5");
        assert_eq!(extract_exp(&missing), None);
        let overflow = URL_SAFE_NO_PAD.encode("exp=99999999999999999999999");
        assert_eq!(extract_exp(&overflow), None);
        let negative = URL_SAFE_NO_PAD.encode("exp=-5");
        assert_eq!(extract_exp(&negative), None);
        assert_eq!(extract_exp("%%%"), None);
    }

    #[test]
    fn oversized_tokens_are_rejected() {
        let token = format!("{}.{}", "a".repeat(MAX_TOKEN_CHARS), "AA");
        assert!(split(&token).is_none());
    }

    #[test]
    fn liveness_is_strict() {
        let verified = Verified { exp: 100 };
        assert!(verified.is_live(99));
        assert!(!verified.is_live(100));
        assert!(!verified.is_live(101));
    }
}
