// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented text protocol spoken by the operator command channel.
//!
//! Wire format: CRLF/LF-delimited lines over a plain TCP socket. No framing
//! beyond the line terminator; no binary payloads.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod command;
mod error;
mod reply;
mod status;

pub use command::{parse_command, Command, PhoneVerb, RegisterFields};
pub use error::ProtocolError;
pub use reply::{error_phone_not_found, greeting, ok, unknown_command};
pub use status::{render_status, StatusUpdate, WorkerStatusEntry};
