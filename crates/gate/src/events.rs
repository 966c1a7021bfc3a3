use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Request headers checked, in order, for a coarse country code.
pub const COUNTRY_HEADERS: &[&str] = &["x-vercel-ip-country", "cf-ipcountry", "x-country-code"];

/// Audit record for one login attempt. Carries no IP or user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateEvent {
    pub created_at_ms: u64,
    pub country: Option<String>,
    pub success: bool,
}

impl GateEvent {
    pub fn now(country: Option<&str>, success: bool) -> Self {
        Self {
            created_at_ms: unix_ms_now(),
            country: country.and_then(normalize_country),
            success,
        }
    }
}

/// Write-only destination for gate events. Implementations must not block.
pub trait GateEventSink: Send + Sync {
    fn record(&self, event: &GateEvent);
}

/// Default sink: one structured log line per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl GateEventSink for LogEventSink {
    fn record(&self, event: &GateEvent) {
        log::info!(
            target: "gate::audit",
            "gate attempt success={} country={} at_ms={}",
            event.success,
            event.country.as_deref().unwrap_or("-"),
            event.created_at_ms
        );
    }
}

/// Two ASCII letters, uppercased. Anything else (including the `XX`/`T1` placeholders
/// some proxies send) is dropped.
pub fn normalize_country(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let code = code.to_ascii_uppercase();
    (code != "XX").then_some(code)
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_country_codes() {
        assert_eq!(normalize_country("de"), Some("DE".to_string()));
        assert_eq!(normalize_country(" US "), Some("US".to_string()));
        assert_eq!(normalize_country("XX"), None);
        assert_eq!(normalize_country("T1"), None);
        assert_eq!(normalize_country("USA"), None);
        assert_eq!(normalize_country(""), None);
    }

    #[test]
    fn event_records_normalized_country() {
        let event = GateEvent::now(Some("fr"), true);
        assert_eq!(event.country.as_deref(), Some("FR"));
        assert!(event.success);
        assert!(event.created_at_ms > 0);
    }
}
