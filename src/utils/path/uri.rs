//! Resource URI helpers.
//!
//! Model resources are addressed by forward-slash URIs relative to the
//! model base directory (`css/site.css`, `js/**/*.js`), or by absolute
//! `http(s)` URLs that this server never fetches.

/// Check if a URI points outside the local resource tree (`http:`, `https:`,
/// protocol-relative `//`, or `data:`).
pub fn is_external(uri: &str) -> bool {
    let lower = uri.trim_start().to_ascii_lowercase();
    lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
        || lower.starts_with("data:")
}

/// Directory part of a URI, without trailing slash (`"css/a.css"` → `"css"`).
pub fn parent_dir(uri: &str) -> &str {
    uri.rfind('/').map_or("", |i| &uri[..i])
}

/// Resolve `relative` against directory `base`, collapsing `.` and `..`.
///
/// Leading `/` on `relative` makes it root-relative. Segments that would climb
/// above the root are dropped, so the result never escapes the resource tree.
///
/// ```ignore
/// assert_eq!(join_relative("css/theme", "../img/bg.png"), "css/img/bg.png");
/// ```
pub fn join_relative(base: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let start = if relative.starts_with('/') { "" } else { base };

    for segment in start.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
