// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered phone identity and configuration.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier for a registered phone, derived from MAC address + hardware
/// name at registration time (`register <urlencoded>`). Stable across
/// daemon restarts and used as the [`crate::PhoneConfig`] roster key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneId(pub String);

impl PhoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a `PhoneId` the way `register` does: lowercased MAC with `:`
    /// replaced by `_`, joined to the hardware name with `_`.
    pub fn from_registration(mac: &str, hardware: &str) -> Self {
        let mac = mac.to_lowercase().replace(':', "_");
        let hardware = hardware.to_lowercase();
        Self(format!("{mac}_{hardware}"))
    }
}

impl fmt::Display for PhoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PhoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PhoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for PhoneId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PhoneId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for PhoneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Configuration for a registered device, as carried verbatim in the roster
/// file. Mutated only by operator commands (`enable`, `disable`, `debug`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneConfig {
    pub phoneid: PhoneId,
    pub serial: String,
    pub ip: String,
    pub sutcmdport: u16,
    pub machinetype: String,
    pub osver: String,
    #[serde(default = "default_debug")]
    pub debug: u8,
}

fn default_debug() -> u8 {
    3
}

impl PhoneConfig {
    /// Matches `find(phoneid_or_serial)`: accept either the serial or the phoneid.
    pub fn matches(&self, needle: &str) -> bool {
        self.serial == needle || self.phoneid.as_str() == needle
    }
}

#[cfg(test)]
#[path = "phone_tests.rs"]
mod tests;
