//! Host identifiers and input normalization.

use std::borrow::Borrow;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;
use url::{Host, Url};

/// Raw host input that could not be turned into a [`HostId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid host {input:?}: {reason}")]
pub struct InvalidHost {
    /// The input as given by the caller.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl InvalidHost {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A normalized host key: a hostname or an IP address.
///
/// URLs are reduced to their host component, domains are lowercased and IP
/// addresses are printed in canonical form, so `http://Example.com/path` and
/// `example.com` are the same `HostId`.
///
/// # Example
///
/// ```rust
/// use pingwatch_types::HostId;
///
/// let a = HostId::parse("http://example.com/path").unwrap();
/// let b = HostId::parse("example.com").unwrap();
/// assert_eq!(a, b);
///
/// assert!(HostId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HostId(String);

impl HostId {
    /// Normalize raw user input into a host identifier.
    ///
    /// Accepts bare hostnames, IPv4/IPv6 literals (bracketed or not) and
    /// URLs with any scheme; ports, paths, queries and credentials are
    /// discarded.
    pub fn parse(raw: &str) -> Result<Self, InvalidHost> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidHost::new(raw, "empty input"));
        }

        let bare = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(Self(ip.to_string()));
        }

        // Inputs without a scheme are parsed as if they were http URLs so
        // that `host/path` and `host:port` reduce the same way.
        let parsed = if trimmed.contains("://") {
            Url::parse(trimmed)
        } else {
            Url::parse(&format!("http://{trimmed}"))
        }
        .map_err(|e| InvalidHost::new(raw, e.to_string()))?;

        let host = match parsed.host() {
            Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_ascii_lowercase(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(InvalidHost::new(raw, "no host component")),
        };

        if host.is_empty() {
            return Err(InvalidHost::new(raw, "empty after normalization"));
        }
        // A leading dash would be read as an option by the ping binary.
        if host.starts_with('-') {
            return Err(InvalidHost::new(raw, "host must not start with '-'"));
        }

        Ok(Self(host))
    }

    /// The normalized host string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the normalized string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HostId {
    type Err = InvalidHost;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for HostId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HostId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
