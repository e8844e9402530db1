// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client side syslog forwarding over UDP.
//!
//! Application log events become RFC 5424 style datagrams sent to a remote collector.
//! Logging never blocks the caller, and messages produced before the network is usable
//! are queued and delivered in order once it is.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod errors;
pub mod formatter;
pub mod forwarder;
pub mod hook;
pub mod identity;
pub mod layer;
pub mod pending;
pub mod probe;
pub mod readiness;
pub mod severity;
pub mod transport;

pub use config::{ForwarderConfig, RetryPolicy};
pub use errors::{ConfigError, DiscoveryError, TransportError};
pub use forwarder::Forwarder;
pub use hook::{HostLogKind, LogHandler, LogSource};
pub use layer::ForwarderLayer;
pub use probe::{ConnectivityProbe, HttpProbe, StaticProbe};
pub use readiness::ReadinessState;
pub use severity::{Facility, Severity};
