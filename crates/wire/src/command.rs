// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line parsing for the operator channel's verb set.

use crate::error::ProtocolError;

/// One phone-targeted verb: look up a worker by phoneid/serial, then invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneVerb {
    Disable,
    Enable,
    Debug,
    Ping,
}

/// Registration fields carried by a `register <urlencoded>` command, already
/// decoded and lowercased (the daemon lowercases the whole payload before
/// parsing, matching the original's `data.lower()` before `parse_qs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFields {
    pub name: String,
    pub hardware: String,
    pub pool: String,
    pub ipaddr: String,
    pub cmdport: u16,
    pub os: String,
}

/// A parsed command line, ready for the engine to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    Log(String),
    TriggerJobs(String),
    Register(RegisterFields),
    Status,
    Phone {
        verb: PhoneVerb,
        target: String,
        args: Option<String>,
    },
    Quit,
    Unknown(String),
}

/// Parse one stripped, non-empty command line.
pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let line = line.trim();
    let (verb, params) = match line.split_once(' ') {
        Some((v, p)) => (v, p.trim()),
        None => (line, ""),
    };
    let verb_lc = verb.to_lowercase();

    Ok(match verb_lc.as_str() {
        "stop" => Command::Stop,
        "log" => Command::Log(params.to_string()),
        "triggerjobs" => Command::TriggerJobs(params.to_string()),
        "register" => Command::Register(parse_register(params)?),
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        "disable" | "enable" | "debug" | "ping" => {
            let (target, args) = match params.split_once(' ') {
                Some((t, a)) if !a.trim().is_empty() => (t.to_string(), Some(a.trim().to_string())),
                Some((t, _)) => (t.to_string(), None),
                None => (params.to_string(), None),
            };
            let verb = match verb_lc.as_str() {
                "disable" => PhoneVerb::Disable,
                "enable" => PhoneVerb::Enable,
                "debug" => PhoneVerb::Debug,
                _ => PhoneVerb::Ping,
            };
            Command::Phone { verb, target, args }
        }
        _ => Command::Unknown(verb.to_string()),
    })
}

fn parse_register(data: &str) -> Result<RegisterFields, ProtocolError> {
    let data = data.to_lowercase();
    let mut fields = std::collections::HashMap::new();
    for pair in data.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        fields.insert(key.to_string(), percent_decode(value));
    }

    let field = |name: &'static str| {
        fields
            .get(name)
            .cloned()
            .ok_or(ProtocolError::MissingRegisterField(name))
    };

    let name = field("name")?;
    let hardware = field("hardware")?;
    let pool = field("pool")?;
    let ipaddr = field("ipaddr")?;
    let os = field("os")?;
    let cmdport_raw = field("cmdport")?;
    let cmdport: u16 = cmdport_raw
        .parse()
        .map_err(|_| ProtocolError::InvalidCmdPort(cmdport_raw.clone()))?;

    Ok(RegisterFields {
        name,
        hardware,
        pool,
        ipaddr,
        cmdport,
        os,
    })
}

/// Minimal `application/x-www-form-urlencoded` value decoder: `+` becomes a
/// space, `%XX` is hex-decoded, everything else passes through verbatim.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                    if let Ok(byte) = u8::from_str_radix(hex, 16) {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                }
                out.push(bytes[i]);
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
