// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::Path;

const UNKNOWN_PROCESS: &str = "unknown";

/// APP-NAME and PROCID values stamped on every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub process_name: String,
    pub platform: String,
}

impl ProcessIdentity {
    pub fn new(process_name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            process_name: sanitize(&process_name.into()),
            platform: sanitize(&platform.into()).to_lowercase(),
        }
    }

    /// Executable name and operating system of the current process.
    pub fn detect() -> Self {
        let process_name = env::current_exe()
            .ok()
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_PROCESS.to_string());
        Self::new(process_name, env::consts::OS)
    }
}

impl Default for ProcessIdentity {
    fn default() -> Self {
        Self::detect()
    }
}

/// Syslog header fields are space separated, so whitespace is dropped.
fn sanitize(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        UNKNOWN_PROCESS.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_removed() {
        let identity = ProcessIdentity::new("My Game Server", " Windows Player ");
        assert_eq!(identity.process_name, "MyGameServer");
        assert_eq!(identity.platform, "windowsplayer");
    }

    #[test]
    fn test_empty_values_fall_back() {
        let identity = ProcessIdentity::new("   ", "");
        assert_eq!(identity.process_name, "unknown");
        assert_eq!(identity.platform, "unknown");
    }

    #[test]
    fn test_detect() {
        let identity = ProcessIdentity::detect();
        assert!(!identity.process_name.contains(' '));
        assert_eq!(identity.platform, env::consts::OS);
    }
}
