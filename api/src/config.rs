//! Service configuration
//!
//! Loaded from a TOML file. Every section is optional:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//!
//! [auth]
//! secret = "change-me"
//! token_ttl_hours = 8
//!
//! [sla]
//! sweep_interval_secs = 300
//! critical = { first_response_minutes = 30, resolution_minutes = 240 }
//!
//! [access]
//! allow_employee_email_link = false
//! ```

use std::path::Path;
use std::time::Duration;

use itdesk_support::{AccessConfig, SlaTable, MAX_SWEEP_INTERVAL};
use serde::{Deserialize, Serialize};

/// Default config file, overridden by `ITDESK_CONFIG`
pub const DEFAULT_CONFIG_PATH: &str = "itdesk.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub sla: SlaSettings,
    pub access: AccessConfig,
    /// Seed one company and admin on start (in-memory development setups)
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl_hours: u32,
}

/// Signing secret used when none is configured
pub const DEV_SECRET: &str = "itdesk-dev-secret-change-in-production";

impl Default for AuthConfig {
    fn default() -> Self {
        Self { secret: DEV_SECRET.into(), token_ttl_hours: 8 }
    }
}

impl AuthConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaSettings {
    pub sweep_interval_secs: u64,
    #[serde(flatten)]
    pub table: SlaTable,
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self { sweep_interval_secs: 300, table: SlaTable::default() }
    }
}

impl SlaSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub company: String,
    pub admin_name: String,
    pub admin_email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("config file {0} not found")]
    Missing(String),
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] itdesk_support::ConfigError),
}

impl ServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::Missing(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, LoadError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), itdesk_support::ConfigError> {
        use itdesk_support::ConfigError;

        self.sla.table.validate()?;
        let interval = self.sla.sweep_interval_secs;
        if interval == 0 || interval > MAX_SWEEP_INTERVAL.as_secs() {
            return Err(ConfigError::SweepInterval(interval));
        }
        if self.auth.secret.is_empty() {
            return Err(ConfigError::Invalid("auth.secret must not be empty".into()));
        }
        if self.auth.token_ttl_hours == 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ServiceConfig::parse("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.sla.table, SlaTable::default());
        assert!(!config.access.allow_employee_email_link);
    }

    #[test]
    fn test_dev_secret_is_detected() {
        assert!(ServiceConfig::default().auth.uses_dev_secret());
        let config = ServiceConfig::parse("[auth]\nsecret = \"s3cr3t\"\n").unwrap();
        assert!(!config.auth.uses_dev_secret());
        assert_eq!(config.auth.token_ttl_hours, 8);
    }

    #[test]
    fn test_partial_sla_override() {
        let config = ServiceConfig::parse(
            r#"
            [sla]
            sweep_interval_secs = 60
            critical = { first_response_minutes = 30, resolution_minutes = 120 }
            "#,
        )
        .unwrap();
        assert_eq!(config.sla.table.critical.first_response_minutes, 30);
        assert_eq!(config.sla.table.high, SlaTable::default().high);
        assert_eq!(config.sla.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let slow = ServiceConfig::parse("[sla]\nsweep_interval_secs = 7200\n");
        assert!(matches!(slow, Err(LoadError::Invalid(_))));

        let inverted = ServiceConfig::parse("[sla.low]\nfirst_response_minutes = 100\nresolution_minutes = 10\n");
        assert!(matches!(inverted, Err(LoadError::Invalid(_))));
    }
}
