// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards `tracing` events to a syslog collector.
//!
//! ```rust,ignore
//! use tracing_subscriber::prelude::*;
//!
//! let forwarder = Forwarder::start_with_http_probe(config).await;
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(ForwarderLayer::new(forwarder.clone()))
//!     .init();
//! ```
//!
//! Events emitted by this crate are skipped, otherwise a failing send would log about
//! itself forever.

use std::fmt::{self, Write};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::forwarder::Forwarder;
use crate::severity::Severity;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

pub struct ForwarderLayer {
    forwarder: Forwarder,
}

impl ForwarderLayer {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

fn severity_for(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        Level::INFO => Severity::Informational,
        _ => Severity::Debug,
    }
}

/// Collects the `message` field followed by the remaining fields as `name=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl MessageVisitor {
    fn into_text(mut self) -> String {
        self.message.push_str(&self.fields);
        self.message
    }
}

impl<S: Subscriber> Layer<S> for ForwarderLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET) {
            return;
        }

        let severity = severity_for(metadata.level());
        if !severity.is_enabled_for(self.forwarder.config().minimum_severity) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.forwarder.log(severity, &visitor.into_text());
    }
}
