use anyhow::{Context as AnyhowContext, Result};
use exchange_gate::{GateConfig, PASSWORD_ENV, SECRET_ENV};
use std::net::SocketAddr;

pub(crate) async fn resolve_guarded_bind_addrs(
    bind: &str,
    public: bool,
) -> Result<Vec<SocketAddr>> {
    let addrs = resolve_bind_addrs(bind).await?;
    enforce_bind_guard_for_addrs(bind, &addrs, public)?;
    Ok(addrs)
}

pub(crate) fn choose_preferred_bind_addr(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
}

/// A public site with a half-configured gate would only ever show the login page.
pub(crate) fn ensure_gate_ready_for_public(config: &GateConfig, public: bool) -> Result<()> {
    if public && !config.is_complete() {
        anyhow::bail!("--public requires a configured gate: export {PASSWORD_ENV} and {SECRET_ENV}")
    }
    Ok(())
}

async fn resolve_bind_addrs(bind: &str) -> Result<Vec<SocketAddr>> {
    // Tokio resolution keeps "localhost" working.
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();

    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to zero socket addrs: {bind}")
    }
    Ok(addrs)
}

fn enforce_bind_guard_for_addrs(bind: &str, addrs: &[SocketAddr], public: bool) -> Result<()> {
    let any_non_loopback = addrs.iter().any(|addr| !addr.ip().is_loopback());
    if any_non_loopback && !public {
        anyhow::bail!(
            "Refusing to bind to non-loopback address without --public: {bind}. To expose the site, pass --public and set {PASSWORD_ENV} and {SECRET_ENV}."
        )
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_guard_requires_public_for_non_loopback() {
        resolve_guarded_bind_addrs("127.0.0.1:0", false)
            .await
            .unwrap();

        assert!(resolve_guarded_bind_addrs("0.0.0.0:0", false)
            .await
            .is_err());
        resolve_guarded_bind_addrs("0.0.0.0:0", true).await.unwrap();
    }

    #[test]
    fn public_bind_needs_complete_gate() {
        let partial = GateConfig::new(Some("pw"), None);
        assert!(ensure_gate_ready_for_public(&partial, true).is_err());
        ensure_gate_ready_for_public(&partial, false).unwrap();

        let complete = GateConfig::new(Some("pw"), Some("secret"));
        ensure_gate_ready_for_public(&complete, true).unwrap();
    }

    #[test]
    fn prefers_ipv4_when_resolving_to_many() {
        let addrs: Vec<SocketAddr> = vec![
            "[::1]:8080".parse().unwrap(),
            "127.0.0.1:8080".parse().unwrap(),
        ];
        assert_eq!(
            choose_preferred_bind_addr(&addrs),
            Some("127.0.0.1:8080".parse().unwrap())
        );
        assert_eq!(choose_preferred_bind_addr(&[]), None);
    }
}
