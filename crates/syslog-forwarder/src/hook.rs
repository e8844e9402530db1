// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bridge for hosts that deliver their own log events through a callback.
//!
//! The host owns the event source and implements [`LogSource`]; the forwarder only
//! implements [`LogHandler`].

use std::sync::Arc;

use crate::forwarder::Forwarder;
use crate::severity::Severity;

/// Kinds of log events a host callback reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostLogKind {
    Assert,
    Error,
    Exception,
    Warning,
    Log,
}

impl From<HostLogKind> for Severity {
    fn from(kind: HostLogKind) -> Self {
        match kind {
            HostLogKind::Assert => Severity::Alert,
            HostLogKind::Error | HostLogKind::Exception => Severity::Error,
            HostLogKind::Warning => Severity::Warning,
            HostLogKind::Log => Severity::Debug,
        }
    }
}

/// Receives host log events.
pub trait LogHandler: Send + Sync {
    fn on_log(&self, condition: &str, stack_trace: &str, kind: HostLogKind);
}

/// Host side subscription to log events.
pub trait LogSource {
    fn register(&mut self, handler: Arc<dyn LogHandler>);
    fn unregister(&mut self, handler: &Arc<dyn LogHandler>);
}

impl LogHandler for Forwarder {
    fn on_log(&self, condition: &str, stack_trace: &str, kind: HostLogKind) {
        let severity = Severity::from(kind);
        if stack_trace.is_empty() {
            self.log(severity, condition);
        } else {
            self.log_with_stack_trace(severity, condition, stack_trace);
        }
    }
}
