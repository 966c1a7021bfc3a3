use std::time::Duration;

/// `Set-Cookie` value carrying a gate token.
pub fn session_cookie(name: &str, token: &str, max_age: Duration) -> String {
    format!(
        "{name}={token}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that overwrites the gate cookie with nothing.
pub fn cleared_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Lax")
}

/// First value for `name` in a `Cookie` request header.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_restrictive() {
        let cookie = session_cookie("xg_gate", "abc.def", Duration::from_secs(86_400));
        assert_eq!(
            cookie,
            "xg_gate=abc.def; Path=/; Max-Age=86400; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = cleared_cookie("xg_gate");
        assert!(cookie.starts_with("xg_gate=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let header = "theme=dark; xg_gate=abc.def; other=1";
        assert_eq!(find_cookie(header, "xg_gate"), Some("abc.def"));
        assert_eq!(find_cookie(header, "missing"), None);
        assert_eq!(find_cookie("xg_gate=", "xg_gate"), Some(""));
        assert_eq!(find_cookie("garbage", "xg_gate"), None);
    }
}
