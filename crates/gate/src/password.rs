use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time password check.
///
/// Both sides are hashed first so the comparison always runs over 32 bytes and the
/// expected password's length does not leak.
pub fn passwords_match(submitted: &str, expected: &str) -> bool {
    let submitted = Sha256::digest(submitted.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    bool::from(submitted.as_slice().ct_eq(expected.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_identical_passwords() {
        assert!(passwords_match("open sesame", "open sesame"));
        assert!(!passwords_match("open sesame ", "open sesame"));
        assert!(!passwords_match("", "open sesame"));
        assert!(!passwords_match("OPEN SESAME", "open sesame"));
    }
}
