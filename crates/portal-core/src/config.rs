//! Configuration types for the portal
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use crate::codec::encode_name;
use crate::dns::MAX_BLOCKED;

/// Main portal configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// DNS responder settings
    #[serde(default)]
    pub dns: DnsConfig,

    /// HTTP router settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl PortalConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing sections take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Point both listeners at the same device address
    pub fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.dns.address = address;
        self.http.portal_address = address;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.dns.validate()?;
        self.http.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// DNS responder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address to bind the UDP socket to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// UDP port; 0 picks an ephemeral port
    #[serde(default = "default_dns_port")]
    pub port: u16,

    /// Address every answered query resolves to
    #[serde(default = "default_portal_address")]
    pub address: Ipv4Addr,

    /// Names answered with NXDOMAIN
    #[serde(default)]
    pub blocked: Vec<String>,
}

impl DnsConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.blocked.len() > MAX_BLOCKED {
            return Err(crate::Error::config(format!(
                "At most {} blocked names are supported, got {}",
                MAX_BLOCKED,
                self.blocked.len()
            )));
        }
        for name in &self.blocked {
            encode_name(name).map_err(|e| {
                crate::Error::config(format!("Blocked name '{}' is invalid: {}", name, e))
            })?;
        }
        Ok(())
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_dns_port(),
            address: default_portal_address(),
            blocked: Vec::new(),
        }
    }
}

/// HTTP router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to bind the TCP listener to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// TCP port; 0 picks an ephemeral port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Virtual host name served by the path table (may be empty)
    #[serde(default)]
    pub host: String,

    /// Address the device answers on; always accepted as a Host value
    #[serde(default = "default_portal_address")]
    pub portal_address: Ipv4Addr,

    /// How long a freshly accepted client has to send its first byte
    ///
    /// Clients that stay silent are closed without a response.
    #[serde(default = "default_accept_grace_ms")]
    pub accept_grace_ms: u64,
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.accept_grace_ms == 0 {
            return Err(crate::Error::config("HTTP accept grace must be > 0"));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(crate::Error::config(format!(
                "HTTP host '{}' contains whitespace",
                self.host
            )));
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_http_port(),
            host: String::new(),
            portal_address: default_portal_address(),
            accept_grace_ms: default_accept_grace_ms(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_dns_port() -> u16 {
    53
}

fn default_http_port() -> u16 {
    80
}

fn default_portal_address() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 4, 1)
}

fn default_accept_grace_ms() -> u64 {
    250
}

fn default_event_channel_capacity() -> usize {
    256
}
