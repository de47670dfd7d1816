//! Application settings configuration
//!
//! Defines the DNS resolver, DANE lookup mode and SMTP probe settings.

use crate::utils::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// DNS resolver settings
#[derive(Debug, Clone, Deserialize)]
pub struct DnsSettings {
    /// Resolver host. `"default"`, `"0"` or an empty string selects the first
    /// nameserver from the system configuration.
    #[serde(default = "default_dns_host")]
    pub host: String,
    /// Resolver port, `0` keeps the port of the selected nameserver
    #[serde(default = "default_dns_port")]
    pub port: u16,
    /// Send every query over TCP instead of UDP with TCP fallback
    #[serde(default)]
    pub tcp_only: bool,
    #[serde(default = "default_dns_timeout")]
    pub timeout_secs: u64,
}

fn default_dns_host() -> String {
    "default".to_string()
}

fn default_dns_port() -> u16 {
    53
}

fn default_dns_timeout() -> u64 {
    10
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            host: default_dns_host(),
            port: default_dns_port(),
            tcp_only: false,
            timeout_secs: default_dns_timeout(),
        }
    }
}

impl DnsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether the system resolver configuration should pick the host
    pub fn uses_system_host(&self) -> bool {
        let host = self.host.trim();
        host.is_empty() || host == "0" || host.eq_ignore_ascii_case("default")
    }
}

/// DANE lookup settings
#[derive(Debug, Clone, Deserialize)]
pub struct DaneSettings {
    /// Resolve MX records with DNSSEC. TLSA records are always resolved
    /// securely regardless of this flag.
    #[serde(default = "default_secure_mx")]
    pub secure_mx: bool,
}

fn default_secure_mx() -> bool {
    true
}

impl Default for DaneSettings {
    fn default() -> Self {
        Self {
            secure_mx: default_secure_mx(),
        }
    }
}

/// SMTP probe settings
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_helo_name")]
    pub helo_name: String,
    /// Log the SMTP dialog at debug level under the `smtp.wire` target
    #[serde(default)]
    pub wire_log: bool,
}

fn default_smtp_port() -> u16 {
    25
}

fn default_connect_timeout() -> u64 {
    3
}

fn default_read_timeout() -> u64 {
    10
}

fn default_helo_name() -> String {
    "localhost".to_string()
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            port: default_smtp_port(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            helo_name: default_helo_name(),
            wire_log: false,
        }
    }
}

impl SmtpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dns: DnsSettings,
    #[serde(default)]
    pub dane: DaneSettings,
    #[serde(default)]
    pub smtp: SmtpSettings,
}

impl Settings {
    /// Load settings from the default config file
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new("config/default.toml");
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dns.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "dns.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "smtp.port".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.smtp.helo_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "smtp.helo_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
