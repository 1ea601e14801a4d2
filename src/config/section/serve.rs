//! `[serve]` section configuration.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"   # 0.0.0.0 to listen on all interfaces
//! port = 8089
//! prefix = "/wro"           # groups are served at <prefix>/<group>.<js|css>
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub interface: IpAddr,
    pub port: u16,
    /// URL prefix for group, admin and proxy requests.
    pub prefix: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8089,
            prefix: "/wro".into(),
        }
    }
}

impl ServeConfig {
    const PREFIX: FieldPath = FieldPath::new("serve.prefix");

    /// Prefix without trailing slash (`""` for `/`).
    pub fn normalized_prefix(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    /// Check whether a request path falls under the prefix.
    pub fn matches(&self, path: &str) -> bool {
        let prefix = self.normalized_prefix();
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.prefix.starts_with('/') {
            diag.error_with_hint(
                Self::PREFIX,
                format!("`{}` is not an absolute URL path", self.prefix),
                "use a path such as \"/wro\"",
            );
        }
        if self.prefix.contains(['?', '#']) {
            diag.error(Self::PREFIX, "prefix must not contain a query or fragment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_serve_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.serve.port, 8089);
        assert_eq!(config.serve.prefix, "/wro");
    }

    #[test]
    fn test_serve_parse() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"\nport = 9000\nprefix = \"/assets/\"");
        assert_eq!(config.serve.interface, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.serve.normalized_prefix(), "/assets");
    }

    #[test]
    fn test_prefix_matching() {
        let serve = ServeConfig::default();
        assert!(serve.matches("/wro/all.js"));
        assert!(serve.matches("/wro"));
        assert!(!serve.matches("/wrong/all.js"));
        assert!(!serve.matches("/other/all.js"));

        let root = ServeConfig {
            prefix: "/".into(),
            ..ServeConfig::default()
        };
        assert!(root.matches("/all.js"));
    }

    #[test]
    fn test_validate_prefix() {
        let mut diag = ConfigDiagnostics::new();
        ServeConfig::default().validate(&mut diag);
        assert!(diag.is_empty());

        let serve = ServeConfig {
            prefix: "wro?x".into(),
            ..ServeConfig::default()
        };
        serve.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
