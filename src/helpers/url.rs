//! URL helper functions

use crate::config::SiteConfig;

/// Join a path onto a site root
///
/// # Examples
/// ```ignore
/// join_root("/site/", "css/style.css") // -> "/site/css/style.css"
/// ```
pub fn join_root(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/blog/hello/") // -> "/site/blog/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    join_root(&config.root, path)
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/site/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Public URL of a page key: `index` is the root, `blog/index` is `/blog/`
pub fn page_url(config: &SiteConfig, key: &str) -> String {
    let path = match key.strip_suffix("index") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => dir.to_string(),
        _ => key.to_string(),
    };
    url_for(config, &path)
}

/// Decode a percent-encoded URL path
pub fn decode_url(path: &str) -> String {
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .to_string()
}

fn is_external(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}
