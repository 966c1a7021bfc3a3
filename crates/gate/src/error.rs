use thiserror::Error;

/// Result type for gate operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors surfaced by the login action.
///
/// Token verification never produces an error: a bad token is simply not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Expected password or signing secret is not configured
    #[error("Gate is misconfigured: {missing} is not set")]
    Misconfigured { missing: &'static str },

    /// Submitted password does not match
    #[error("Invalid password")]
    InvalidPassword,

    /// Signing key was rejected by the MAC implementation
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}

impl GateError {
    /// Message safe to show to the person at the login form.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidPassword => "Invalid password",
            Self::Misconfigured { .. } | Self::InvalidKey(_) => {
                "The server is misconfigured. Please try again later."
            }
        }
    }
}
