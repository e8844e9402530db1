// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The public forwarding surface.
//!
//! A [`Forwarder`] is started once from inside a tokio runtime and then handed around as
//! a cheap clone. Logging calls are synchronous and never block on the network: they
//! filter, format, and either queue the line (before readiness) or push it to the
//! transport task. If the configuration is unusable or the socket can't be opened the
//! forwarder stays alive as a no-op.

use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ForwarderConfig;
use crate::errors::TransportError;
use crate::formatter::{format_body, MessageFormatter};
use crate::identity::ProcessIdentity;
use crate::probe::{ConnectivityProbe, HttpProbe};
use crate::readiness::{Discovery, ReadinessGate, ReadinessState, Routed};
use crate::severity::{encode, Facility, Severity};
use crate::transport::Transport;

struct Pipeline {
    transport: Transport,
    gate: Arc<ReadinessGate>,
}

struct ForwarderInner {
    config: ForwarderConfig,
    formatter: MessageFormatter,
    pipeline: Option<Pipeline>,
    tag: RwLock<Option<String>>,
    cancel_token: CancellationToken,
}

impl Drop for ForwarderInner {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(pipeline) = &self.pipeline {
            pipeline.transport.close();
        }
    }
}

#[derive(Clone)]
pub struct Forwarder {
    inner: Arc<ForwarderInner>,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("hostname", &self.inner.config.hostname)
            .field("port", &self.inner.config.port)
            .field("readiness", &self.readiness())
            .finish_non_exhaustive()
    }
}

impl Forwarder {
    /// Starts a forwarder that discovers connectivity through the configured HTTP
    /// lookup endpoint.
    pub async fn start_with_http_probe(config: ForwarderConfig) -> Self {
        let probe = Arc::new(HttpProbe::new(config.ip_lookup_url.clone()));
        Self::start(config, probe).await
    }

    pub async fn start(config: ForwarderConfig, probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self::start_with_identity(config, ProcessIdentity::detect(), probe).await
    }

    /// Validates `config`, opens the transport and spawns the transport and discovery
    /// tasks. Must be called from within a tokio runtime.
    pub async fn start_with_identity(
        config: ForwarderConfig,
        identity: ProcessIdentity,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        let config = config.normalized();
        let cancel_token = CancellationToken::new();
        let formatter = MessageFormatter::new(
            config.system_name.clone(),
            identity.process_name,
            identity.platform,
            config.include_client_ip,
        );

        let pipeline = match open_pipeline(&config, probe, &cancel_token).await {
            Ok(pipeline) => {
                info!(
                    "Forwarding syslog to {}:{} ({})",
                    config.hostname,
                    config.port,
                    pipeline.transport.remote_addr()
                );
                Some(pipeline)
            }
            Err(e) => {
                error!("Syslog forwarding disabled: {}", e);
                None
            }
        };

        Self {
            inner: Arc::new(ForwarderInner {
                config,
                formatter,
                pipeline,
                tag: RwLock::new(None),
                cancel_token,
            }),
        }
    }

    /// Sets the tag added to every later message. Messages already formatted keep the
    /// tag they were built with.
    pub fn set_tag(&self, tag: impl Into<String>) {
        let tag = tag.into();
        #[allow(clippy::expect_used)]
        let mut current = self.inner.tag.write().expect("lock poisoned");
        *current = (!tag.is_empty()).then_some(tag);
    }

    pub fn clear_tag(&self) {
        #[allow(clippy::expect_used)]
        let mut current = self.inner.tag.write().expect("lock poisoned");
        *current = None;
    }

    #[must_use]
    pub fn tag(&self) -> Option<String> {
        #[allow(clippy::expect_used)]
        let current = self.inner.tag.read().expect("lock poisoned");
        current.clone()
    }

    /// Logs `text` at `Debug` with the configured facility.
    pub fn log_message(&self, text: &str) {
        self.log(Severity::Debug, text);
    }

    pub fn log(&self, severity: Severity, text: &str) {
        self.submit(self.inner.config.facility, severity, text, None);
    }

    pub fn log_with_facility(&self, facility: Facility, severity: Severity, text: &str) {
        self.submit(facility, severity, text, None);
    }

    /// Logs with a stack trace, which is only included when stack traces are enabled
    /// in the configuration.
    pub fn log_with_stack_trace(&self, severity: Severity, text: &str, stack_trace: &str) {
        self.submit(
            self.inner.config.facility,
            severity,
            text,
            Some(stack_trace),
        );
    }

    /// Stops discovery and closes the transport. Messages still queued are discarded
    /// and later calls are no-ops. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.inner.cancel_token.cancel();
        let Some(pipeline) = &self.inner.pipeline else {
            return;
        };
        if pipeline.transport.is_closed() {
            return;
        }
        pipeline.transport.close();
        let discarded = pipeline.gate.discard_pending();
        debug!(
            "Syslog forwarder shut down, {} queued messages discarded",
            discarded
        );
    }

    /// `None` when forwarding is disabled.
    #[must_use]
    pub fn readiness(&self) -> Option<ReadinessState> {
        self.inner
            .pipeline
            .as_ref()
            .map(|pipeline| pipeline.gate.state())
    }

    /// Whether messages can still be forwarded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner
            .pipeline
            .as_ref()
            .is_some_and(|pipeline| !pipeline.transport.is_closed())
    }

    /// Number of messages waiting for readiness.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .pipeline
            .as_ref()
            .map_or(0, |pipeline| pipeline.gate.pending_len())
    }

    #[must_use]
    pub fn config(&self) -> &ForwarderConfig {
        &self.inner.config
    }

    fn submit(
        &self,
        facility: Facility,
        severity: Severity,
        text: &str,
        stack_trace: Option<&str>,
    ) -> Option<Routed> {
        let inner = &self.inner;
        if text.is_empty() || !severity.is_enabled_for(inner.config.minimum_severity) {
            return None;
        }
        let pipeline = inner.pipeline.as_ref()?;
        if pipeline.transport.is_closed() {
            return None;
        }

        let stack_trace = stack_trace.filter(|_| inner.config.include_stack_trace);
        let body = {
            #[allow(clippy::expect_used)]
            let tag = inner.tag.read().expect("lock poisoned");
            format_body(tag.as_deref(), text, stack_trace)
        };
        let client_ip = pipeline.gate.client_ip();
        let message = inner
            .formatter
            .format(encode(facility, severity), client_ip.as_deref(), &body);
        Some(pipeline.gate.submit(message, &pipeline.transport))
    }
}

async fn open_pipeline(
    config: &ForwarderConfig,
    probe: Arc<dyn ConnectivityProbe>,
    cancel_token: &CancellationToken,
) -> Result<Pipeline, TransportError> {
    config.validate()?;
    let (service, transport) = Transport::open(&config.hostname, config.port).await?;

    let initial_client_ip = config
        .include_client_ip
        .then(|| transport.local_addr().ip().to_string());
    let gate = Arc::new(ReadinessGate::new(initial_client_ip));

    tokio::spawn(service.run());
    let discovery = Discovery::new(
        Arc::clone(&gate),
        probe,
        config.retry_policy(),
        config.include_client_ip,
        transport.clone(),
        cancel_token.child_token(),
    );
    tokio::spawn(discovery.run());

    Ok(Pipeline { transport, gate })
}
