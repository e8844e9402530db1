// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the forwarding pipeline.
//!
//! None of these ever reach a log call site: the forwarder reports them through
//! `tracing` and keeps running, or degrades to a no-op.

use std::io;

/// Invalid or missing forwarder settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Remote hostname is not set")]
    MissingHostname,

    #[error("Invalid remote port: {0}")]
    InvalidPort(String),

    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}

/// Failure to open the UDP transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("No address found for {0}")]
    NoAddress(String),

    #[error("Failed to bind local UDP socket: {0}")]
    Bind(#[source] io::Error),

    #[error("Failed to connect UDP socket to {addr}: {source}")]
    Connect {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Transport configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

/// A failed connectivity discovery step. Transient unless `Exhausted`.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Network is not reachable")]
    Unreachable,

    #[error("External address lookup failed: {0}")]
    Lookup(String),

    #[error("External address lookup returned an empty body")]
    EmptyAddress,

    #[error("Gave up on {phase} after {attempts} attempts")]
    Exhausted { phase: &'static str, attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::InvalidPort("0".to_string());
        assert_eq!(error.to_string(), "Invalid remote port: 0");

        let error = ConfigError::InvalidValue {
            field: "facility",
            value: "local9".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid value 'local9' for facility");
    }

    #[test]
    fn test_transport_error_wraps_config_error() {
        let error = TransportError::from(ConfigError::MissingHostname);
        assert_eq!(
            error.to_string(),
            "Transport configuration rejected: Remote hostname is not set"
        );
    }

    #[test]
    fn test_discovery_exhausted_display() {
        let error = DiscoveryError::Exhausted {
            phase: "reachability",
            attempts: 3,
        };
        assert_eq!(error.to_string(), "Gave up on reachability after 3 attempts");
    }
}
