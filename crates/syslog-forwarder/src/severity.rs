// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog severities, facilities and the PRI value built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Syslog urgency, most urgent first.
///
/// `Off` is a local sentinel. It is never encoded on the wire: a message carrying it is
/// dropped, and a configured minimum of `Off` suppresses every message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    /// System is unusable
    Emergency = 0,
    /// Action must be taken immediately
    Alert = 1,
    /// Critical conditions
    Critical = 2,
    /// Error conditions
    Error = 3,
    /// Warning conditions
    Warning = 4,
    /// Normal but significant condition
    Notice = 5,
    /// Informational messages
    Informational = 6,
    /// Debug-level messages
    Debug = 7,
    /// Never send
    Off = 99,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Informational,
        Severity::Debug,
    ];

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns true when a message of this severity passes the `minimum` threshold.
    #[must_use]
    pub fn is_enabled_for(self, minimum: Severity) -> bool {
        self != Severity::Off && minimum != Severity::Off && self <= minimum
    }

    const fn name(self) -> &'static str {
        match self {
            Severity::Emergency => "emergency",
            Severity::Alert => "alert",
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Informational => "informational",
            Severity::Debug => "debug",
            Severity::Off => "off",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let severity = match value.as_str() {
            "0" | "emergency" | "emerg" => Severity::Emergency,
            "1" | "alert" => Severity::Alert,
            "2" | "critical" | "crit" => Severity::Critical,
            "3" | "error" | "err" => Severity::Error,
            "4" | "warning" | "warn" => Severity::Warning,
            "5" | "notice" => Severity::Notice,
            "6" | "informational" | "info" => Severity::Informational,
            "7" | "debug" => Severity::Debug,
            "99" | "off" => Severity::Off,
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "severity",
                    value: s.to_string(),
                })
            }
        };
        Ok(severity)
    }
}

impl TryFrom<String> for Severity {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.to_string()
    }
}

/// Syslog facility, selecting the high bits of the PRI value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Facility {
    Kern = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    AuthPriv = 10,
    Ftp = 11,
    Ntp = 12,
    Security = 13,
    Console = 14,
    SolarisCron = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    #[default]
    Local7 = 23,
}

impl Facility {
    pub const ALL: [Facility; 24] = [
        Facility::Kern,
        Facility::User,
        Facility::Mail,
        Facility::Daemon,
        Facility::Auth,
        Facility::Syslog,
        Facility::Lpr,
        Facility::News,
        Facility::Uucp,
        Facility::Cron,
        Facility::AuthPriv,
        Facility::Ftp,
        Facility::Ntp,
        Facility::Security,
        Facility::Console,
        Facility::SolarisCron,
        Facility::Local0,
        Facility::Local1,
        Facility::Local2,
        Facility::Local3,
        Facility::Local4,
        Facility::Local5,
        Facility::Local6,
        Facility::Local7,
    ];

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    const fn name(self) -> &'static str {
        match self {
            Facility::Kern => "kern",
            Facility::User => "user",
            Facility::Mail => "mail",
            Facility::Daemon => "daemon",
            Facility::Auth => "auth",
            Facility::Syslog => "syslog",
            Facility::Lpr => "lpr",
            Facility::News => "news",
            Facility::Uucp => "uucp",
            Facility::Cron => "cron",
            Facility::AuthPriv => "authpriv",
            Facility::Ftp => "ftp",
            Facility::Ntp => "ntp",
            Facility::Security => "security",
            Facility::Console => "console",
            Facility::SolarisCron => "solaris-cron",
            Facility::Local0 => "local0",
            Facility::Local1 => "local1",
            Facility::Local2 => "local2",
            Facility::Local3 => "local3",
            Facility::Local4 => "local4",
            Facility::Local5 => "local5",
            Facility::Local6 => "local6",
            Facility::Local7 => "local7",
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Facility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        if let Ok(code) = value.parse::<u8>() {
            return Facility::ALL
                .get(usize::from(code))
                .copied()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "facility",
                    value: s.to_string(),
                });
        }
        Facility::ALL
            .into_iter()
            .find(|facility| facility.name() == value)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "facility",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Facility {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

impl From<Facility> for String {
    fn from(facility: Facility) -> Self {
        facility.to_string()
    }
}

/// Builds the syslog PRI value, `facility * 8 + severity`.
///
/// No range checks happen here; `Severity::Off` has to be filtered out before this point.
#[must_use]
pub fn encode(facility: Facility, severity: Severity) -> u16 {
    u16::from(facility.code()) * 8 + u16::from(severity.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_local0_error() {
        assert_eq!(encode(Facility::Local0, Severity::Error), 131);
    }

    #[test]
    fn test_encode_extremes() {
        assert_eq!(encode(Facility::Kern, Severity::Emergency), 0);
        assert_eq!(encode(Facility::Local7, Severity::Debug), 191);
    }

    proptest! {
        #[test]
        fn test_encode_is_facility_times_eight_plus_severity(
            f in 0usize..24,
            s in 0usize..8,
        ) {
            let facility = Facility::ALL[f];
            let severity = Severity::ALL[s];
            let expected = u16::try_from(f * 8 + s).unwrap();
            prop_assert_eq!(encode(facility, severity), expected);
            prop_assert_eq!(facility.code() as usize, f);
            prop_assert_eq!(severity.code() as usize, s);
        }
    }

    #[test]
    fn test_threshold_direction() {
        assert!(Severity::Error.is_enabled_for(Severity::Warning));
        assert!(Severity::Warning.is_enabled_for(Severity::Warning));
        assert!(!Severity::Debug.is_enabled_for(Severity::Warning));
        assert!(Severity::Debug.is_enabled_for(Severity::Debug));
    }

    #[test]
    fn test_off_never_enabled() {
        assert!(!Severity::Off.is_enabled_for(Severity::Debug));
        assert!(!Severity::Off.is_enabled_for(Severity::Off));
        for severity in Severity::ALL {
            assert!(!severity.is_enabled_for(Severity::Off));
        }
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("Warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!(" warn ".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("3".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("OFF".parse::<Severity>().unwrap(), Severity::Off);
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_facility_from_str() {
        assert_eq!("local0".parse::<Facility>().unwrap(), Facility::Local0);
        assert_eq!("LOCAL7".parse::<Facility>().unwrap(), Facility::Local7);
        assert_eq!("16".parse::<Facility>().unwrap(), Facility::Local0);
        assert_eq!("solaris-cron".parse::<Facility>().unwrap(), Facility::SolarisCron);
        assert!("24".parse::<Facility>().is_err());
        assert!("local8".parse::<Facility>().is_err());
    }
}
