//! Two HMAC-SHA256 backends behind one verification contract.
//!
//! [`ServerVerifier`] is synchronous and uses the `hmac` crate; page guards call it
//! inline. [`EdgeVerifier`] is the request-interception path: async, and built only
//! from the raw SHA-256 digest the way a Web-crypto style runtime exposes it. Both
//! must accept exactly the same tokens.

use crate::error::{GateError, Result};
use crate::token::{self, Verified};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SHA256_BLOCK_BYTES: usize = 64;
const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Server,
    Edge,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Edge => "edge",
        }
    }
}

/// Signature and shape check only. `exp` is returned, not compared to the clock.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    fn backend(&self) -> Backend;

    async fn verify(&self, token: &str) -> Option<Verified>;
}

#[derive(Clone)]
pub struct ServerVerifier {
    mac: HmacSha256,
}

impl ServerVerifier {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| GateError::InvalidKey(err.to_string()))?;
        Ok(Self { mac })
    }

    pub fn sign(&self, payload_segment: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload_segment.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Token valid until `exp`.
    pub fn issue(&self, exp: u64) -> token::IssuedToken {
        let payload = token::encode_payload(exp);
        let signature = self.sign(&payload);
        token::IssuedToken {
            value: token::assemble(&payload, &signature),
            exp,
        }
    }

    pub fn verify_now(&self, token: &str) -> Option<Verified> {
        let (payload, signature) = token::split(token)?;
        let expected = self.sign(payload);
        if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            return None;
        }
        token::extract_exp(payload).map(|exp| Verified { exp })
    }
}

#[async_trait]
impl TokenVerifier for ServerVerifier {
    fn backend(&self) -> Backend {
        Backend::Server
    }

    async fn verify(&self, token: &str) -> Option<Verified> {
        self.verify_now(token)
    }
}

/// HMAC assembled from SHA-256 block operations (RFC 2104).
#[derive(Clone)]
pub struct EdgeVerifier {
    inner_pad: [u8; SHA256_BLOCK_BYTES],
    outer_pad: [u8; SHA256_BLOCK_BYTES],
}

impl EdgeVerifier {
    pub fn new(secret: &str) -> Self {
        let mut key = [0u8; SHA256_BLOCK_BYTES];
        let secret = secret.as_bytes();
        if secret.len() > SHA256_BLOCK_BYTES {
            let digest = Sha256::digest(secret);
            key[..digest.len()].copy_from_slice(&digest);
        } else {
            key[..secret.len()].copy_from_slice(secret);
        }

        let mut inner_pad = [0u8; SHA256_BLOCK_BYTES];
        let mut outer_pad = [0u8; SHA256_BLOCK_BYTES];
        for (i, byte) in key.iter().enumerate() {
            inner_pad[i] = byte ^ IPAD;
            outer_pad[i] = byte ^ OPAD;
        }
        Self {
            inner_pad,
            outer_pad,
        }
    }

    async fn digest(&self, message: &[u8]) -> [u8; 32] {
        let inner = Sha256::new()
            .chain_update(self.inner_pad)
            .chain_update(message)
            .finalize();
        let outer = Sha256::new()
            .chain_update(self.outer_pad)
            .chain_update(inner)
            .finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&outer);
        out
    }
}

#[async_trait]
impl TokenVerifier for EdgeVerifier {
    fn backend(&self) -> Backend {
        Backend::Edge
    }

    async fn verify(&self, token: &str) -> Option<Verified> {
        let (payload, signature) = token::split(token)?;
        let expected = self.digest(payload.as_bytes()).await;
        if !constant_time_eq(&expected, &signature) {
            return None;
        }
        token::extract_exp(payload).map(|exp| Verified { exp })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
