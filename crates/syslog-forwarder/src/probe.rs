// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Connectivity probes used by the readiness gate.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::errors::DiscoveryError;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Answers the two questions the readiness gate asks before it lets messages out.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the network looks usable at all.
    async fn is_reachable(&self) -> bool;

    /// The externally visible address of this client.
    async fn resolve_client_ip(&self) -> Result<String, DiscoveryError>;

    /// False when this probe has no way to learn an external address, in which case
    /// discovery keeps the local address and skips the lookup.
    fn resolves_client_ip(&self) -> bool {
        true
    }
}

/// Probe backed by an HTTP endpoint that echoes the caller's address as plain text.
///
/// Reachability is a DNS resolution of the lookup endpoint's host, which fails fast
/// while the machine has no usable network.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    lookup_url: String,
}

impl HttpProbe {
    pub fn new(lookup_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("Unable to build HTTP client for address lookup: {}, using defaults", e);
                reqwest::Client::new()
            });
        Self {
            client,
            lookup_url: lookup_url.into(),
        }
    }

    #[must_use]
    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        let url = match reqwest::Url::parse(&self.lookup_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Invalid lookup url {}: {}", self.lookup_url, e);
                return false;
            }
        };
        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return false;
        };
        let reachable = match tokio::net::lookup_host((host, port)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                debug!("Network not reachable ({}): {}", host, e);
                false
            }
        };
        reachable
    }

    async fn resolve_client_ip(&self) -> Result<String, DiscoveryError> {
        let response = self
            .client
            .get(&self.lookup_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DiscoveryError::Lookup(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Lookup(e.to_string()))?;

        let address = body.trim();
        if address.is_empty() {
            return Err(DiscoveryError::EmptyAddress);
        }
        // Captive portals answer with HTML; only accept an actual address.
        address
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| DiscoveryError::Lookup(format!("not an IP address: '{address}'")))
    }
}

/// Probe that is always reachable and reports a fixed address, for hosts that already
/// know it or don't want any discovery traffic.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    client_ip: Option<String>,
}

impl StaticProbe {
    pub fn new(client_ip: Option<String>) -> Self {
        Self { client_ip }
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_reachable(&self) -> bool {
        true
    }

    async fn resolve_client_ip(&self) -> Result<String, DiscoveryError> {
        self.client_ip.clone().ok_or(DiscoveryError::EmptyAddress)
    }

    fn resolves_client_ip(&self) -> bool {
        self.client_ip.is_some()
    }
}
