// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Connectivity-gated startup.
//!
//! The gate starts `NotReady` and routes every message into the pending queue. A single
//! [`Discovery`] task waits for the network, optionally resolves the external client
//! address, publishes it, drains the queue through the transport and only then flips
//! the gate to `Ready`. The flip happens after the queue has been observed empty and
//! closed under its lock, so once the gate reports `Ready` nothing is ever queued again
//! and everything queued earlier was handed to the transport first.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RetryPolicy;
use crate::errors::DiscoveryError;
use crate::formatter::FormattedMessage;
use crate::pending::{Enqueued, PendingQueue};
use crate::probe::ConnectivityProbe;
use crate::transport::Transport;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// Discovery still running; messages are queued.
    NotReady = 0,
    /// Messages go straight to the transport.
    Ready = 1,
    /// A bounded retry policy ran out before the network became reachable. Pending
    /// messages were discarded and new ones are dropped.
    Abandoned = 2,
}

impl ReadinessState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ReadinessState::Ready,
            2 => ReadinessState::Abandoned,
            _ => ReadinessState::NotReady,
        }
    }
}

/// What happened to a submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Queued,
    Sent,
    Dropped,
}

#[derive(Debug)]
pub struct ReadinessGate {
    state: AtomicU8,
    pending: PendingQueue,
    client_ip: RwLock<Option<Arc<str>>>,
}

impl ReadinessGate {
    /// `initial_client_ip` annotates messages until discovery publishes the external
    /// address.
    pub fn new(initial_client_ip: Option<String>) -> Self {
        Self {
            state: AtomicU8::new(ReadinessState::NotReady as u8),
            pending: PendingQueue::new(),
            client_ip: RwLock::new(initial_client_ip.map(Arc::from)),
        }
    }

    #[must_use]
    pub fn state(&self) -> ReadinessState {
        ReadinessState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    #[must_use]
    pub fn client_ip(&self) -> Option<Arc<str>> {
        #[allow(clippy::expect_used)]
        let client_ip = self.client_ip.read().expect("lock poisoned");
        client_ip.clone()
    }

    fn publish_client_ip(&self, client_ip: String) {
        #[allow(clippy::expect_used)]
        let mut current = self.client_ip.write().expect("lock poisoned");
        *current = Some(Arc::from(client_ip));
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queues `message` while not ready, sends it once ready, drops it if abandoned.
    /// The queue-or-send decision is taken under the pending queue's lock.
    pub fn submit(&self, message: FormattedMessage, transport: &Transport) -> Routed {
        match self.pending.enqueue(message) {
            Enqueued::Queued => Routed::Queued,
            Enqueued::Closed(message) => {
                // `abandon` stores its state before closing the queue.
                if self.state() == ReadinessState::Abandoned {
                    return Routed::Dropped;
                }
                transport.send(message);
                Routed::Sent
            }
        }
    }

    /// Drains the queue into `transport` and flips to `Ready`. Only the discovery task
    /// calls this, once.
    async fn open(&self, transport: &Transport) {
        let drained = self.pending.drain_into(transport).await;
        if self
            .state
            .compare_exchange(
                ReadinessState::NotReady as u8,
                ReadinessState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            info!("Syslog forwarder ready, flushed {} queued messages", drained);
        }
    }

    /// Closes the queue and drops what it holds without touching the state. Used on
    /// shutdown.
    pub fn discard_pending(&self) -> usize {
        self.pending.close_and_discard()
    }

    fn abandon(&self) {
        self.state
            .store(ReadinessState::Abandoned as u8, Ordering::Release);
        let discarded = self.pending.close_and_discard();
        if discarded > 0 {
            warn!("Discarded {} queued messages", discarded);
        }
    }
}

/// Background task that brings a [`ReadinessGate`] to `Ready`.
pub struct Discovery {
    gate: Arc<ReadinessGate>,
    probe: Arc<dyn ConnectivityProbe>,
    policy: RetryPolicy,
    resolve_client_ip: bool,
    transport: Transport,
    cancel_token: CancellationToken,
}

impl Discovery {
    pub fn new(
        gate: Arc<ReadinessGate>,
        probe: Arc<dyn ConnectivityProbe>,
        policy: RetryPolicy,
        resolve_client_ip: bool,
        transport: Transport,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            gate,
            probe,
            policy,
            resolve_client_ip,
            transport,
            cancel_token,
        }
    }

    pub async fn run(self) {
        debug!("Connectivity discovery started");

        let discovered = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => {
                debug!("Connectivity discovery cancelled");
                return;
            }
            discovered = self.discover() => discovered,
        };

        match discovered {
            Ok(client_ip) => {
                if self.cancel_token.is_cancelled() {
                    debug!("Connectivity discovery cancelled");
                    return;
                }
                if let Some(client_ip) = client_ip {
                    debug!("Resolved external client address {}", client_ip);
                    self.gate.publish_client_ip(client_ip);
                }
                self.gate.open(&self.transport).await;
            }
            Err(e) => {
                error!("Connectivity discovery stopped: {}", e);
                self.gate.abandon();
            }
        }
    }

    async fn discover(&self) -> Result<Option<String>, DiscoveryError> {
        self.wait_until_reachable().await?;

        if !self.resolve_client_ip || !self.probe.resolves_client_ip() {
            return Ok(None);
        }

        match self.lookup_client_ip().await {
            Ok(client_ip) => Ok(Some(client_ip)),
            Err(e) => {
                warn!("{}, keeping the local client address", e);
                Ok(None)
            }
        }
    }

    async fn wait_until_reachable(&self) -> Result<(), DiscoveryError> {
        let mut attempts = 0;
        while !self.probe.is_reachable().await {
            attempts += 1;
            debug!("{} (attempt {})", DiscoveryError::Unreachable, attempts);
            if self.policy.is_exhausted(attempts) {
                return Err(DiscoveryError::Exhausted {
                    phase: "network reachability",
                    attempts,
                });
            }
            sleep(self.policy.interval).await;
        }
        Ok(())
    }

    async fn lookup_client_ip(&self) -> Result<String, DiscoveryError> {
        let mut attempts = 0;
        loop {
            match self.probe.resolve_client_ip().await {
                Ok(client_ip) => return Ok(client_ip),
                Err(e) => {
                    attempts += 1;
                    debug!("External address lookup failed (attempt {}): {}", attempts, e);
                    if self.policy.is_exhausted(attempts) {
                        return Err(DiscoveryError::Exhausted {
                            phase: "external address lookup",
                            attempts,
                        });
                    }
                    sleep(self.policy.interval).await;
                }
            }
        }
    }
}
