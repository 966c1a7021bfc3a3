/// Where to send someone after login. Anything that could leave the site collapses
/// to `/`: it must start with `/`, must not start with `//`, and must not contain a
/// backslash or control characters.
pub fn safe_next_path(raw: Option<&str>) -> String {
    match raw {
        Some(path) if is_safe_next_path(path) => path.to_string(),
        _ => "/".to_string(),
    }
}

pub fn is_safe_next_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}
