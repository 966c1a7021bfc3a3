/// Consecutive failures after which the login page offers a "request access" panel.
pub const ASSISTANCE_THRESHOLD: u32 = 3;

const MAX_TRACKED_FAILURES: u32 = 99;

/// Failed-login counter that lives with the client (a hidden form field).
///
/// This is a UX hint only. The client can reset or forge it at will, so it must never
/// be used for throttling or lockout; real rate limiting would have to be server-side.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoginAttempts {
    consecutive_failures: u32,
}

impl LoginAttempts {
    /// Parse the round-tripped counter; garbage reads as zero.
    pub fn from_form(raw: Option<&str>) -> Self {
        let consecutive_failures = raw
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(0)
            .min(MAX_TRACKED_FAILURES);
        Self {
            consecutive_failures,
        }
    }

    pub fn consecutive_failures(self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_failure(self) -> Self {
        Self {
            consecutive_failures: (self.consecutive_failures + 1).min(MAX_TRACKED_FAILURES),
        }
    }

    pub fn reset(self) -> Self {
        Self::default()
    }

    pub fn offer_assistance(self) -> bool {
        self.consecutive_failures >= ASSISTANCE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_failure_opens_assistance() {
        let attempts = LoginAttempts::default().record_failure();
        assert!(!attempts.offer_assistance());
        let attempts = attempts.record_failure();
        assert!(!attempts.offer_assistance());
        let attempts = attempts.record_failure();
        assert_eq!(attempts.consecutive_failures(), 3);
        assert!(attempts.offer_assistance());
        assert_eq!(attempts.reset().consecutive_failures(), 0);
    }

    #[test]
    fn form_value_is_parsed_leniently() {
        assert_eq!(LoginAttempts::from_form(Some("2")).consecutive_failures(), 2);
        assert_eq!(LoginAttempts::from_form(Some("nope")).consecutive_failures(), 0);
        assert_eq!(LoginAttempts::from_form(None).consecutive_failures(), 0);
        assert_eq!(
            LoginAttempts::from_form(Some("4000000000")).consecutive_failures(),
            MAX_TRACKED_FAILURES
        );
    }
}
