use std::{
    env::{self, VarError},
    fmt,
    num::NonZeroU16,
};

use url::{Host, Url};

use crate::error::CountError;

pub const HOST_VAR: &str = "OPENSEARCH_HOST";
pub const PORT_VAR: &str = "OPENSEARCH_PORT";
pub const USERNAME_VAR: &str = "OPENSEARCH_USERNAME";
pub const PASSWORD_VAR: &str = "OPENSEARCH_PASSWORD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Scheme {
    #[strum(serialize = "http")]
    Http,
    #[strum(serialize = "https")]
    Https,
}

/// Where and how to reach the search service.
///
/// The transport-security switches are plain fields so that callers can see
/// what they get. The defaults applied by [`ConnectionConfig::from_env`] turn
/// TLS on but do NOT verify the server certificate or its hostname: traffic is
/// encrypted, the peer is not authenticated.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_ssl: bool,
    pub verify_certs: bool,
    pub ssl_assert_hostname: bool,
    pub http_compress: bool,
    pub ssl_show_warn: bool,
}

impl ConnectionConfig {
    /// Reads `OPENSEARCH_HOST`, `OPENSEARCH_PORT`, `OPENSEARCH_USERNAME` and
    /// `OPENSEARCH_PASSWORD` from the process environment.
    pub fn from_env() -> Result<Self, CountError> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Same as [`ConnectionConfig::from_env`] with the variable source supplied
    /// by the caller. The lookup reports errors the way [`env::var`] does.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CountError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let required = |key: &'static str| match lookup(key) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) | Err(VarError::NotPresent) => Err(CountError::MissingConfiguration(key)),
            Err(VarError::NotUnicode(_)) => Err(CountError::NotUnicode(key)),
        };

        let host = required(HOST_VAR)?;
        let port = parse_port(&required(PORT_VAR)?)?;
        let username = required(USERNAME_VAR)?;
        let password = required(PASSWORD_VAR)?;

        Ok(Self {
            host,
            port,
            username,
            password,
            use_ssl: true,
            verify_certs: false,
            ssl_assert_hostname: false,
            http_compress: true,
            ssl_show_warn: false,
        })
    }

    pub fn scheme(&self) -> Scheme {
        if self.use_ssl {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// `<scheme>://<host>:<port>/`. The host must be a bare domain or IP
    /// address: anything that would add login info, a port or a path is an
    /// `InvalidHost`.
    pub fn url(&self) -> Result<Url, CountError> {
        let invalid = |source| CountError::InvalidHost {
            host: self.host.clone(),
            source,
        };
        let host = Host::parse(&self.host).map_err(invalid)?;
        let raw = format!("{}://{}:{}", self.scheme(), host, self.port);
        Url::parse(&raw).map_err(invalid)
    }
}

fn parse_port(value: &str) -> Result<u16, CountError> {
    value
        .trim()
        .parse::<NonZeroU16>()
        .map(NonZeroU16::get)
        .map_err(|source| CountError::InvalidPort {
            value: value.to_string(),
            source,
        })
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .field("verify_certs", &self.verify_certs)
            .field("ssl_assert_hostname", &self.ssl_assert_hostname)
            .field("http_compress", &self.http_compress)
            .field("ssl_show_warn", &self.ssl_show_warn)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        vars(&[
            (HOST_VAR, "search.example.com"),
            (PORT_VAR, "9200"),
            (USERNAME_VAR, "admin"),
            (PASSWORD_VAR, "secret"),
        ])
    }

    fn load(env: &HashMap<String, String>) -> Result<ConnectionConfig, CountError> {
        ConnectionConfig::from_lookup(|key| env.get(key).cloned().ok_or(VarError::NotPresent))
    }

    #[test]
    fn from_lookup_applies_fixed_policy() {
        let config = load(&full_env()).unwrap();
        assert_eq!(
            config,
            ConnectionConfig {
                host: "search.example.com".to_string(),
                port: 9200,
                username: "admin".to_string(),
                password: "secret".to_string(),
                use_ssl: true,
                verify_certs: false,
                ssl_assert_hostname: false,
                http_compress: true,
                ssl_show_warn: false,
            }
        );
        assert_eq!(
            config.url().unwrap().as_str(),
            "https://search.example.com:9200/"
        );
    }

    #[test]
    fn each_missing_variable_is_reported() {
        for var in [HOST_VAR, PORT_VAR, USERNAME_VAR, PASSWORD_VAR] {
            let mut env = full_env();
            env.remove(var);
            match load(&env) {
                Err(CountError::MissingConfiguration(name)) => assert_eq!(name, var),
                other => panic!("expected missing {var}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert(USERNAME_VAR.to_string(), String::new());
        assert!(matches!(
            load(&env),
            Err(CountError::MissingConfiguration(USERNAME_VAR))
        ));
    }

    #[test]
    fn non_numeric_port_is_invalid() {
        let mut env = full_env();
        env.insert(PORT_VAR.to_string(), "abc".to_string());
        match load(&env) {
            Err(CountError::InvalidPort { value, .. }) => assert_eq!(value, "abc"),
            other => panic!("expected invalid port, got {other:?}"),
        }
    }

    #[test]
    fn zero_and_out_of_range_ports_are_invalid() {
        for port in ["0", "65536", "-1"] {
            let mut env = full_env();
            env.insert(PORT_VAR.to_string(), port.to_string());
            assert!(
                matches!(load(&env), Err(CountError::InvalidPort { .. })),
                "port {port} accepted"
            );
        }
    }

    #[test]
    fn plain_http_when_ssl_disabled() {
        let mut config = load(&full_env()).unwrap();
        config.use_ssl = false;
        assert_eq!(config.scheme(), Scheme::Http);
        assert_eq!(
            config.url().unwrap().as_str(),
            "http://search.example.com:9200/"
        );
    }

    #[test]
    fn host_that_cannot_form_a_url_is_rejected() {
        let mut env = full_env();
        env.insert(HOST_VAR.to_string(), "bad host".to_string());
        let config = load(&env).unwrap();
        assert!(matches!(config.url(), Err(CountError::InvalidHost { .. })));
    }

    #[test]
    fn host_with_path_login_or_port_is_rejected() {
        for host in [
            "search.example.com/",
            "user@evil.com",
            "search.example.com:443",
            "search.example.com?x",
        ] {
            let mut env = full_env();
            env.insert(HOST_VAR.to_string(), host.to_string());
            let config = load(&env).unwrap();
            match config.url() {
                Err(CountError::InvalidHost { host: rejected, .. }) => {
                    assert_eq!(rejected, host)
                }
                other => panic!("host {host} accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn ip_hosts_keep_configured_port() {
        let mut env = full_env();
        env.insert(HOST_VAR.to_string(), "[::1]".to_string());
        let url = load(&env).unwrap().url().unwrap();
        assert_eq!(url.as_str(), "https://[::1]:9200/");
        assert_eq!(url.port(), Some(9200));

        env.insert(HOST_VAR.to_string(), "10.0.0.5".to_string());
        let url = load(&env).unwrap().url().unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.5:9200/");
    }

    #[test]
    fn non_unicode_variable_is_not_reported_as_missing() {
        let env = full_env();
        let result = ConnectionConfig::from_lookup(|key| {
            if key == PASSWORD_VAR {
                Err(VarError::NotUnicode(std::ffi::OsString::from("secret")))
            } else {
                env.get(key).cloned().ok_or(VarError::NotPresent)
            }
        });
        assert!(matches!(result, Err(CountError::NotUnicode(PASSWORD_VAR))));
    }

    #[test]
    fn debug_hides_password() {
        let config = load(&full_env()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
