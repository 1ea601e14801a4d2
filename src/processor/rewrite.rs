//! CSS `url(..)` rewriting.
//!
//! Relative references inside merged stylesheets stop resolving once the
//! CSS is served from the group URL, so each one is turned into a proxy
//! URL (`/wro/wroResources?id=css/img/bg.png`) that the manager serves
//! straight from the resource tree. Only rewritten ids may be proxied.

use std::sync::LazyLock;

use dashmap::DashSet;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};

use crate::locator::has_wildcard;
use crate::manager::{PARAM_RESOURCE_ID, PATH_RESOURCES};
use crate::utils::path::uri::{is_external, join_relative, parent_dir};

/// Decides which resource ids the proxy path may serve.
pub trait AllowList: Send + Sync {
    fn is_uri_allowed(&self, uri: &str) -> bool;
}

/// `url(..)` with optional quotes. CSS whitespace is spelled out since the
/// regex build carries no Unicode class tables.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\([ \t\r\n\f]*(?:"([^"]*)"|'([^']*)'|([^"') \t\r\n\f]*))[ \t\r\n\f]*\)"#)
        .unwrap()
});

/// Keep path separators readable in the query value.
const ID_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_');

/// Rewrites stylesheet URLs and remembers every id it emitted.
#[derive(Debug)]
pub struct CssUrlRewriter {
    proxy_base: String,
    allowed: DashSet<String>,
}

impl CssUrlRewriter {
    /// Rewriter for groups served under `prefix` (e.g. `/wro`).
    pub fn new(prefix: &str) -> Self {
        Self {
            proxy_base: format!(
                "{}/{PATH_RESOURCES}?{PARAM_RESOURCE_ID}=",
                prefix.trim_end_matches('/')
            ),
            allowed: DashSet::new(),
        }
    }

    /// Rewrite `url(..)` references in `css`, which was read from `resource_uri`.
    pub fn rewrite(&self, css: &str, resource_uri: &str) -> String {
        let base = base_dir(resource_uri);
        URL_RE
            .replace_all(css, |caps: &Captures| {
                let target = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map_or("", |m| m.as_str());
                match self.proxy_url(target, &base) {
                    Some(url) => format!("url(\"{url}\")"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Number of ids recorded so far.
    pub fn allowed_count(&self) -> usize {
        self.allowed.len()
    }

    fn proxy_url(&self, target: &str, base: &str) -> Option<String> {
        let target = target.trim();
        if target.is_empty()
            || target.starts_with('#')
            || target.starts_with('/')
            || is_external(target)
        {
            return None;
        }

        let path = target.split(['?', '#']).next().unwrap_or(target);
        let id = join_relative(base, path);
        if id.is_empty() {
            return None;
        }

        let url = format!("{}{}", self.proxy_base, utf8_percent_encode(&id, ID_ENCODE));
        self.allowed.insert(id);
        Some(url)
    }
}

impl AllowList for CssUrlRewriter {
    fn is_uri_allowed(&self, uri: &str) -> bool {
        self.allowed.contains(uri)
    }
}

/// Directory relative URLs resolve against.
///
/// For wildcard URIs this is the folder the wildcard is expanded in.
fn base_dir(resource_uri: &str) -> String {
    if !has_wildcard(resource_uri) {
        return parent_dir(resource_uri).to_string();
    }
    resource_uri
        .split('/')
        .take_while(|s| !has_wildcard(s))
        .collect::<Vec<_>>()
        .join("/")
}
