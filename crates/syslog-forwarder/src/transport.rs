// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! UDP transport to the remote collector.
//!
//! `Transport::open` returns a cheap, cloneable [`Transport`] handle plus the
//! [`TransportService`] that owns the socket. Handles push datagrams onto an unbounded
//! channel and return immediately; the service task writes them to the socket one at a
//! time. Send failures are logged and the datagram is dropped.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::errors::{ConfigError, TransportError};
use crate::formatter::FormattedMessage;

/// Handle used to send datagrams. Cloning it is cheap.
#[derive(Debug, Clone)]
pub struct Transport {
    tx: mpsc::UnboundedSender<FormattedMessage>,
    closed: Arc<AtomicBool>,
    cancel_token: CancellationToken,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
}

impl Transport {
    /// Resolves `hostname`, binds an ephemeral local socket and connects it to the
    /// collector. The returned service must be spawned for datagrams to go out.
    pub async fn open(
        hostname: &str,
        port: u16,
    ) -> Result<(TransportService, Transport), TransportError> {
        let hostname = hostname.trim();
        if hostname.is_empty() {
            return Err(ConfigError::MissingHostname.into());
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort(port.to_string()).into());
        }

        let remote_addr = tokio::net::lookup_host((hostname, port))
            .await
            .map_err(|source| TransportError::Resolve {
                host: hostname.to_string(),
                port,
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::NoAddress(format!("{hostname}:{port}")))?;

        let bind_addr: SocketAddr = if remote_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(TransportError::Bind)?;
        socket
            .connect(remote_addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: remote_addr,
                source,
            })?;
        let local_addr = socket.local_addr().map_err(TransportError::Bind)?;

        debug!(
            "Opened UDP transport {} -> {} ({}:{})",
            local_addr, remote_addr, hostname, port
        );

        Ok(Self::from_socket(socket, local_addr, remote_addr))
    }

    fn from_socket(
        socket: UdpSocket,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    ) -> (TransportService, Transport) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let service = TransportService {
            socket,
            rx,
            cancel_token: cancel_token.clone(),
        };
        let handle = Transport {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            cancel_token,
            local_addr,
            remote_addr,
        };
        (service, handle)
    }

    /// Queues `message` for transmission and returns without waiting for the network.
    /// Messages sent after `close` are dropped.
    pub fn send(&self, message: FormattedMessage) {
        if self.is_closed() {
            debug!("Transport closed, dropping message");
            return;
        }
        if self.tx.send(message).is_err() {
            warn!("Transport service stopped, dropping message");
        }
    }

    /// Stops the transport. Safe to call any number of times.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel_token.cancel();
        debug!("Closed UDP transport to {}", self.remote_addr);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Local address of the connected socket, i.e. the interface that routes to the
    /// collector.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

/// Owns the socket and performs the actual writes.
pub struct TransportService {
    socket: UdpSocket,
    rx: mpsc::UnboundedReceiver<FormattedMessage>,
    cancel_token: CancellationToken,
}

impl TransportService {
    pub async fn run(mut self) {
        debug!("Transport service started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                message = self.rx.recv() => match message {
                    Some(message) => self.send_datagram(&message).await,
                    None => break,
                },
            }
        }

        debug!("Transport service stopped");
    }

    async fn send_datagram(&self, message: &FormattedMessage) {
        match self.socket.send(message.as_bytes()).await {
            Ok(sent) if sent < message.len() => {
                warn!(
                    "Truncated syslog datagram: sent {} of {} bytes",
                    sent,
                    message.len()
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to send syslog datagram: {}", e);
            }
        }
    }
}
