// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed reply strings sent back over the command connection.

/// Sent once, immediately after accept.
pub fn greeting() -> &'static str {
    "Hello? Yes this is Autophone.\n"
}

pub fn ok() -> &'static str {
    "ok"
}

pub fn error_phone_not_found() -> &'static str {
    "error: phone not found"
}

pub fn unknown_command(verb: &str) -> String {
    format!("Unknown command \"{verb}\"\n")
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
