use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

pub const GATE_PATH: &str = "/gate";

const PUBLIC_PREFIXES: &[&str] = &[
    GATE_PATH,
    "/health",
    "/_next",
    "/static",
    "/assets",
    "/images",
    "/fonts",
];

const PUBLIC_FILES: &[&str] = &["/robots.txt", "/sitemap.xml", "/favicon.ico"];

const STATIC_EXTENSIONS: &[&str] = &[
    "png",
    "jpg",
    "jpeg",
    "gif",
    "svg",
    "webp",
    "avif",
    "ico",
    "css",
    "js",
    "map",
    "woff",
    "woff2",
    "ttf",
    "txt",
    "xml",
    "webmanifest",
];

/// Routes reachable without a gate token: the gate itself and static assets.
#[derive(Debug, Clone)]
pub struct PublicPaths {
    prefixes: Vec<String>,
    files: Vec<String>,
    extensions: GlobSet,
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self::new(PUBLIC_PREFIXES, PUBLIC_FILES, STATIC_EXTENSIONS)
    }
}

impl PublicPaths {
    pub fn new(prefixes: &[&str], files: &[&str], extensions: &[&str]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for ext in extensions {
            let ext = ext.trim().trim_start_matches('.');
            if ext.is_empty() {
                continue;
            }
            match GlobBuilder::new(&format!("*.{ext}"))
                .case_insensitive(true)
                .build()
            {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => log::warn!("ignoring static extension {ext:?}: {err}"),
            }
        }
        let extensions = builder.build().unwrap_or_else(|err| {
            log::warn!("static extension allowlist disabled: {err}");
            GlobSet::empty()
        });

        Self {
            prefixes: prefixes.iter().map(|p| normalize_prefix(p)).collect(),
            files: files.iter().map(|f| f.to_string()).collect(),
            extensions,
        }
    }

    /// `path` is the request path without the query string.
    pub fn is_public(&self, path: &str) -> bool {
        if self.files.iter().any(|file| file == path) {
            return true;
        }
        if self
            .prefixes
            .iter()
            .any(|prefix| path_prefix_matches(prefix, path))
        {
            return true;
        }
        // Only the last segment decides: "/brands.css/../secret" must not slip through.
        !path.contains("/../") && !path.ends_with("/..") && self.extensions.is_match(last_segment(path))
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn path_prefix_matches(prefix: &str, path: &str) -> bool {
    if path == prefix {
        return true;
    }

    if !path.starts_with(prefix) {
        return false;
    }

    path.as_bytes().get(prefix.len()) == Some(&b'/')
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
