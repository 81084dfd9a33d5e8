//! Pool keys.

use std::fmt;
use std::hash::Hash;

/// Anything usable as a pool key.
pub trait Route: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Route for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// The target of a connection: scheme, host name and optional explicit port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpHost {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl HttpHost {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self { scheme: scheme.into().to_ascii_lowercase(), host: host.into().to_ascii_lowercase(), port }
    }

    pub fn http(host: impl Into<String>) -> Self {
        Self::new("http", host, None)
    }

    pub fn https(host: impl Into<String>) -> Self {
        Self::new("https", host, None)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// True for `https`.
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// The explicit port, or the default port of the scheme.
    ///
    /// `None` for an unknown scheme without an explicit port.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or(match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        })
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports() {
        assert_eq!(HttpHost::http("example.com").effective_port(), Some(80));
        assert_eq!(HttpHost::https("example.com").effective_port(), Some(443));
        assert_eq!(HttpHost::new("http", "example.com", Some(8080)).effective_port(), Some(8080));
        assert_eq!(HttpHost::new("gopher", "example.com", None).effective_port(), None);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(HttpHost::new("HTTP", "Example.COM", None), HttpHost::http("example.com"));
        assert_eq!(HttpHost::new("https", "localhost", Some(8443)).to_string(), "https://localhost:8443");
    }
}
