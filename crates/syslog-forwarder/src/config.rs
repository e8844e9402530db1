// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ConfigError;
use crate::severity::{Facility, Severity};

pub const DEFAULT_PORT: u16 = 514;
pub const DEFAULT_DISCOVERY_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=text";

const ENV_HOSTNAME: &str = "SYSLOG_HOSTNAME";
const ENV_PORT: &str = "SYSLOG_PORT";
const ENV_SYSTEM_NAME: &str = "SYSLOG_SYSTEM_NAME";
const ENV_MINIMUM_SEVERITY: &str = "SYSLOG_MINIMUM_SEVERITY";
const ENV_FACILITY: &str = "SYSLOG_FACILITY";
const ENV_LOG_STACK_TRACE: &str = "SYSLOG_LOG_STACK_TRACE";
const ENV_LOG_CLIENT_IP: &str = "SYSLOG_LOG_CLIENT_IP";
const ENV_DISCOVERY_INTERVAL_MS: &str = "SYSLOG_DISCOVERY_INTERVAL_MS";
const ENV_DISCOVERY_MAX_ATTEMPTS: &str = "SYSLOG_DISCOVERY_MAX_ATTEMPTS";
const ENV_IP_LOOKUP_URL: &str = "SYSLOG_IP_LOOKUP_URL";

/// How often, and how many times, connectivity discovery retries a failing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_DISCOVERY_INTERVAL_MS),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// True once `attempts` failed tries have used up the budget.
    #[must_use]
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Settings for one forwarder instance.
///
/// Loading and persisting these belongs to the host. `from_env` is provided for
/// processes that keep their settings in the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ForwarderConfig {
    /// Remote collector hostname or IP
    pub hostname: String,
    /// Remote collector UDP port
    pub port: u16,
    /// Name shown as the syslog HOST field
    pub system_name: String,
    /// Least urgent severity that is still sent
    #[serde(alias = "minimum-logging-level")]
    pub minimum_severity: Severity,
    /// Facility used when the caller doesn't pass one
    pub facility: Facility,
    /// Append the caller supplied stack trace
    #[serde(alias = "log-stack-trace")]
    pub include_stack_trace: bool,
    /// Prefix messages with the client address
    #[serde(alias = "log-client-ip-address")]
    pub include_client_ip: bool,
    pub discovery_interval_ms: u64,
    pub discovery_max_attempts: Option<u32>,
    /// Endpoint returning the caller's external address as plain text
    pub ip_lookup_url: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: DEFAULT_PORT,
            system_name: String::new(),
            minimum_severity: Severity::Debug,
            facility: Facility::default(),
            include_stack_trace: true,
            include_client_ip: true,
            discovery_interval_ms: DEFAULT_DISCOVERY_INTERVAL_MS,
            discovery_max_attempts: None,
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
        }
    }
}

impl ForwarderConfig {
    /// Convenience constructor for the two required settings.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Values that can't be parsed keep their default and log a warning; only
    /// `validate` decides whether the result is usable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            hostname: env::var(ENV_HOSTNAME).unwrap_or_default(),
            port: match env::var(ENV_PORT) {
                // An unparseable port must not silently fall back to 514.
                Ok(val) => val.trim().parse::<u16>().unwrap_or_else(|_| {
                    warn!("{ENV_PORT} cannot be parsed: '{val}'");
                    0
                }),
                Err(_) => defaults.port,
            },
            system_name: env::var(ENV_SYSTEM_NAME).unwrap_or_default(),
            minimum_severity: env_or(ENV_MINIMUM_SEVERITY, defaults.minimum_severity),
            facility: env_or(ENV_FACILITY, defaults.facility),
            include_stack_trace: env_bool_or(ENV_LOG_STACK_TRACE, defaults.include_stack_trace),
            include_client_ip: env_bool_or(ENV_LOG_CLIENT_IP, defaults.include_client_ip),
            discovery_interval_ms: env_or(
                ENV_DISCOVERY_INTERVAL_MS,
                defaults.discovery_interval_ms,
            ),
            discovery_max_attempts: env::var(ENV_DISCOVERY_MAX_ATTEMPTS)
                .ok()
                .and_then(|val| parse_or_warn(ENV_DISCOVERY_MAX_ATTEMPTS, &val)),
            ip_lookup_url: env::var(ENV_IP_LOOKUP_URL).unwrap_or(defaults.ip_lookup_url),
        };
        config.normalized()
    }

    /// Trims the hostname. The system name loses its whitespace and has dots replaced,
    /// since it becomes the space delimited HOST field.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.hostname = self.hostname.trim().to_string();
        self.system_name = self
            .system_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .replace('.', "-");
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingHostname);
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }

        if self.discovery_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "discovery interval",
                value: "0".to_string(),
            });
        }

        if self.include_client_ip && self.ip_lookup_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ip lookup url",
                value: self.ip_lookup_url.clone(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.discovery_interval_ms),
            max_attempts: self.discovery_max_attempts,
        }
    }
}

fn env_or<T: FromStr + std::fmt::Debug>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{key} cannot be parsed - using default value of {default:?}");
            default
        }),
        Err(_) => default,
    }
}

fn env_bool_or(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!("{key} cannot be parsed - using default value of {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_or_warn<T: FromStr>(key: &str, val: &str) -> Option<T> {
    let parsed = val.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!("{key} has an invalid value: '{val}'");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_KEYS: [&str; 10] = [
        ENV_HOSTNAME,
        ENV_PORT,
        ENV_SYSTEM_NAME,
        ENV_MINIMUM_SEVERITY,
        ENV_FACILITY,
        ENV_LOG_STACK_TRACE,
        ENV_LOG_CLIENT_IP,
        ENV_DISCOVERY_INTERVAL_MS,
        ENV_DISCOVERY_MAX_ATTEMPTS,
        ENV_IP_LOOKUP_URL,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config_has_no_hostname() {
        let config = ForwarderConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingHostname)));
        assert_eq!(config.port, 514);
        assert_eq!(config.facility, Facility::Local7);
        assert_eq!(config.minimum_severity, Severity::Debug);
        assert!(config.include_stack_trace);
        assert!(config.include_client_ip);
    }

    #[test]
    fn test_validate_invalid_port() {
        let config = ForwarderConfig::new("logs.example.com", 0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = ForwarderConfig {
            discovery_interval_ms: 0,
            ..ForwarderConfig::new("logs.example.com", 514)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lookup_url_only_required_with_client_ip() {
        let mut config = ForwarderConfig {
            ip_lookup_url: String::new(),
            ..ForwarderConfig::new("logs.example.com", 514)
        };
        assert!(config.validate().is_err());

        config.include_client_ip = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_replaces_dots() {
        let config = ForwarderConfig {
            system_name: " game.server.eu ".to_string(),
            ..ForwarderConfig::new("  logs.example.com ", 514)
        }
        .normalized();
        assert_eq!(config.system_name, "game-server-eu");
        assert_eq!(config.hostname, "logs.example.com");
    }

    #[test]
    fn test_normalized_strips_whitespace_from_system_name() {
        let config = ForwarderConfig {
            system_name: "Game Server\tEU".to_string(),
            ..ForwarderConfig::new("logs.example.com", 514)
        }
        .normalized();
        assert_eq!(config.system_name, "GameServerEU");
    }

    #[test]
    fn test_retry_policy() {
        let config = ForwarderConfig {
            discovery_interval_ms: 250,
            discovery_max_attempts: Some(3),
            ..ForwarderConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(!RetryPolicy::default().is_exhausted(u32::MAX));
    }

    #[test]
    fn test_deserialize_with_settings_file_keys() {
        let config: ForwarderConfig = serde_json::from_str(
            r#"{
                "hostname": "logs.example.com",
                "port": 6514,
                "system-name": "game-server",
                "minimum-logging-level": "Warning",
                "facility": "local0",
                "log-stack-trace": false,
                "log-client-ip-address": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.hostname, "logs.example.com");
        assert_eq!(config.port, 6514);
        assert_eq!(config.system_name, "game-server");
        assert_eq!(config.minimum_severity, Severity::Warning);
        assert_eq!(config.facility, Facility::Local0);
        assert!(!config.include_stack_trace);
        assert!(!config.include_client_ip);
        assert_eq!(config.discovery_interval_ms, DEFAULT_DISCOVERY_INTERVAL_MS);
    }

    #[test]
    fn test_deserialize_rejects_unknown_facility() {
        let result = serde_json::from_str::<ForwarderConfig>(r#"{"facility": "local9"}"#);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_with_defaults() {
        clear_env();
        let config = ForwarderConfig::from_env();
        assert_eq!(config, ForwarderConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_all_values() {
        clear_env();
        env::set_var(ENV_HOSTNAME, "logs.example.com");
        env::set_var(ENV_PORT, "514");
        env::set_var(ENV_SYSTEM_NAME, "my.server");
        env::set_var(ENV_MINIMUM_SEVERITY, "warning");
        env::set_var(ENV_FACILITY, "local0");
        env::set_var(ENV_LOG_STACK_TRACE, "false");
        env::set_var(ENV_LOG_CLIENT_IP, "FALSE");
        env::set_var(ENV_DISCOVERY_INTERVAL_MS, "50");
        env::set_var(ENV_DISCOVERY_MAX_ATTEMPTS, "5");

        let config = ForwarderConfig::from_env();
        clear_env();

        assert!(config.validate().is_ok());
        assert_eq!(config.hostname, "logs.example.com");
        assert_eq!(config.system_name, "my-server");
        assert_eq!(config.minimum_severity, Severity::Warning);
        assert_eq!(config.facility, Facility::Local0);
        assert!(!config.include_stack_trace);
        assert!(!config.include_client_ip);
        assert_eq!(config.retry_policy().interval, Duration::from_millis(50));
        assert_eq!(config.retry_policy().max_attempts, Some(5));
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_values_fall_back() {
        clear_env();
        env::set_var(ENV_HOSTNAME, "logs.example.com");
        env::set_var(ENV_MINIMUM_SEVERITY, "very-loud");
        env::set_var(ENV_LOG_STACK_TRACE, "maybe");

        let config = ForwarderConfig::from_env();
        clear_env();

        assert_eq!(config.minimum_severity, Severity::Debug);
        assert!(config.include_stack_trace);
    }

    #[test]
    #[serial]
    fn test_from_env_bad_port_is_invalid() {
        clear_env();
        env::set_var(ENV_HOSTNAME, "logs.example.com");
        env::set_var(ENV_PORT, "not-a-port");

        let config = ForwarderConfig::from_env();
        clear_env();

        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort(_))));
    }
}
