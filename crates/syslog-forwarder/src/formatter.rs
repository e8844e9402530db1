// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builds RFC 5424 style syslog lines.
//!
//! ```text
//! <PRI>1 TIMESTAMP HOST APP-NAME PROCID [ip=[<client ip>] ][tag=[..] ]message=[..][ stacktrace=[..]]
//! ```
//!
//! Every call writes into its own buffer, so concurrent callers can never observe
//! interleaved output.

use std::fmt;

use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// HOST field used when no system name is configured.
pub const DEFAULT_SYSTEM_NAME: &str = "syslog-client";

/// RFC 5424 NILVALUE, used if a timestamp can't be rendered.
const NIL_VALUE: &str = "-";

/// A complete syslog line, ready to be sent as one datagram.
#[derive(Debug, PartialEq, Eq)]
pub struct FormattedMessage(String);

impl FormattedMessage {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FormattedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a UTC RFC 3339 timestamp with at most microsecond precision.
#[must_use]
pub fn rfc3339_timestamp(timestamp: OffsetDateTime) -> String {
    let utc = timestamp.to_offset(UtcOffset::UTC);
    utc.replace_nanosecond(utc.microsecond() * 1_000)
        .ok()
        .and_then(|truncated| truncated.format(&Rfc3339).ok())
        .unwrap_or_else(|| NIL_VALUE.to_string())
}

/// Builds the MSG part: `[tag=[T] ]message=[M][ stacktrace=[S]]`.
#[must_use]
pub fn format_body(tag: Option<&str>, text: &str, stack_trace: Option<&str>) -> String {
    let tag = tag.filter(|tag| !tag.is_empty());
    let mut body = String::with_capacity(
        text.len() + tag.map_or(0, str::len) + stack_trace.map_or(0, str::len) + 32,
    );
    if let Some(tag) = tag {
        body.push_str("tag=[");
        body.push_str(tag);
        body.push_str("] ");
    }
    body.push_str("message=[");
    body.push_str(text);
    body.push(']');
    if let Some(stack_trace) = stack_trace {
        body.push_str(" stacktrace=[");
        body.push_str(stack_trace);
        body.push(']');
    }
    body
}

/// Assembles a full syslog line from its parts.
#[must_use]
pub fn format_message(
    priority: u16,
    timestamp: OffsetDateTime,
    system_name: &str,
    process_name: &str,
    platform_tag: &str,
    client_ip: Option<&str>,
    payload: &str,
) -> FormattedMessage {
    let system_name = if system_name.is_empty() {
        DEFAULT_SYSTEM_NAME
    } else {
        system_name
    };
    let timestamp = rfc3339_timestamp(timestamp);
    let mut line = String::with_capacity(
        timestamp.len() + system_name.len() + process_name.len() + platform_tag.len()
            + payload.len()
            + 32,
    );
    line.push('<');
    line.push_str(&priority.to_string());
    line.push_str(">1 ");
    line.push_str(&timestamp);
    line.push(' ');
    line.push_str(system_name);
    line.push(' ');
    line.push_str(process_name);
    line.push(' ');
    line.push_str(platform_tag);
    line.push(' ');
    if let Some(ip) = client_ip {
        line.push_str("ip=[");
        line.push_str(ip);
        line.push_str("] ");
    }
    line.push_str(payload);
    FormattedMessage(line)
}

/// Holds the per-process HOST, APP-NAME and PROCID values so call sites only pass
/// what changes per message.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    system_name: String,
    process_name: String,
    platform_tag: String,
    include_client_ip: bool,
}

impl MessageFormatter {
    pub fn new(
        system_name: impl Into<String>,
        process_name: impl Into<String>,
        platform_tag: impl Into<String>,
        include_client_ip: bool,
    ) -> Self {
        Self {
            system_name: system_name.into(),
            process_name: process_name.into(),
            platform_tag: platform_tag.into(),
            include_client_ip,
        }
    }

    /// Formats a message stamped with the current UTC time.
    #[must_use]
    pub fn format(&self, priority: u16, client_ip: Option<&str>, payload: &str) -> FormattedMessage {
        self.format_at(priority, OffsetDateTime::now_utc(), client_ip, payload)
    }

    #[must_use]
    pub fn format_at(
        &self,
        priority: u16,
        timestamp: OffsetDateTime,
        client_ip: Option<&str>,
        payload: &str,
    ) -> FormattedMessage {
        let client_ip = if self.include_client_ip {
            client_ip.filter(|ip| !ip.is_empty())
        } else {
            None
        };
        format_message(
            priority,
            timestamp,
            &self.system_name,
            &self.process_name,
            &self.platform_tag,
            client_ip,
            payload,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_format_message_layout() {
        let message = format_message(
            131,
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            "game-server",
            "com.example.game",
            "linux",
            None,
            "message=[disk full]",
        );
        assert_eq!(
            message.as_str(),
            "<131>1 2023-11-14T22:13:20Z game-server com.example.game linux message=[disk full]"
        );
    }

    #[test]
    fn test_empty_system_name_uses_placeholder() {
        let message = format_message(
            14,
            OffsetDateTime::UNIX_EPOCH,
            "",
            "app",
            "linux",
            None,
            "hi",
        );
        assert!(message
            .as_str()
            .starts_with("<14>1 1970-01-01T00:00:00Z syslog-client app linux "));
    }

    #[test]
    fn test_client_ip_prefix() {
        let message = format_message(
            14,
            OffsetDateTime::UNIX_EPOCH,
            "host",
            "app",
            "linux",
            Some("203.0.113.7"),
            "message=[hi]",
        );
        assert!(message.as_str().ends_with(" ip=[203.0.113.7] message=[hi]"));
    }

    #[test]
    fn test_timestamp_is_utc_with_microseconds() {
        let timestamp = OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789)
            .unwrap()
            .to_offset(UtcOffset::from_hms(2, 0, 0).unwrap());
        assert_eq!(rfc3339_timestamp(timestamp), "2023-11-14T22:13:20.123456Z");
    }

    #[test]
    fn test_body_variants() {
        assert_eq!(format_body(None, "hello", None), "message=[hello]");
        assert_eq!(
            format_body(Some("X"), "hello", None),
            "tag=[X] message=[hello]"
        );
        assert_eq!(
            format_body(Some(""), "hello", Some("at main()")),
            "message=[hello] stacktrace=[at main()]"
        );
        assert_eq!(
            format_body(Some("X"), "hello", Some("")),
            "tag=[X] message=[hello] stacktrace=[]"
        );
    }

    #[test]
    fn test_formatter_drops_ip_when_disabled() {
        let formatter = MessageFormatter::new("host", "app", "linux", false);
        let message = formatter.format_at(
            131,
            OffsetDateTime::from_unix_timestamp(1_714_557_600).unwrap(),
            Some("203.0.113.7"),
            "message=[x]",
        );
        assert_eq!(
            message.as_str(),
            "<131>1 2024-05-01T10:00:00Z host app linux message=[x]"
        );
    }

    #[test]
    fn test_formatter_ignores_empty_ip() {
        let formatter = MessageFormatter::new("host", "app", "linux", true);
        let message = formatter.format_at(131, OffsetDateTime::UNIX_EPOCH, Some(""), "m");
        assert!(!message.as_str().contains("ip=["));
    }

    #[test]
    fn test_concurrent_formatting_never_interleaves() {
        let formatter = Arc::new(MessageFormatter::new("host", "app", "linux", true));
        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let formatter = Arc::clone(&formatter);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let payload = format_body(None, &format!("t{thread}-{i}"), None);
                        let message = formatter.format(131, Some("10.0.0.1"), &payload);
                        assert!(message.as_str().starts_with("<131>1 "));
                        assert!(message
                            .as_str()
                            .ends_with(&format!(" host app linux ip=[10.0.0.1] message=[t{thread}-{i}]")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
