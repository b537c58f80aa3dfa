// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Server: the operator's line-oriented TCP control channel
//! (spec.md §4.5). Greets once per connection, then serializes every
//! command but `quit`/`exit` through a single lock so the Worker Registry
//! never sees two commands in flight at once.

use crate::dispatcher::Dispatcher;
use crate::registry::WorkerRegistry;
use farm_adapters::build_cache::BuildCache;
use farm_core::clock::Clock;
use farm_core::worker::WorkerCommand;
use farm_wire::{Command, PhoneVerb, RegisterFields};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};

pub struct CommandServer<C: Clock, B: BuildCache> {
    registry: Arc<WorkerRegistry<C>>,
    dispatcher: Arc<Dispatcher<B>>,
    shutdown: Arc<Notify>,
    cmd_lock: Mutex<()>,
}

impl<C: Clock, B: BuildCache> CommandServer<C, B> {
    pub fn new(registry: Arc<WorkerRegistry<C>>, dispatcher: Arc<Dispatcher<B>>, shutdown: Arc<Notify>) -> Self {
        Self { registry, dispatcher, shutdown, cmd_lock: Mutex::new(()) }
    }

    /// Accept connections until the listener itself errors out; each
    /// connection is handled on its own task so a slow or stuck operator
    /// session never blocks another.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, addr) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(err) = server.handle_connection(stream, addr).await {
                    tracing::warn!(%addr, %err, "command connection ended with an I/O error");
                }
            });
        }
    }

    /// One connection's whole lifetime: greet, line-buffer until `quit`,
    /// `exit`, or EOF. `quit`/`exit` close the socket directly, without
    /// touching `cmd_lock` or sending any reply, matching the original
    /// handler exactly.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> std::io::Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(farm_wire::greeting().as_bytes()).await?;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                tracing::debug!(%addr, "command connection closed by quit/exit");
                return Ok(());
            }

            let response = self.route(line).await;
            write_half.write_all(response.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
        }

        Ok(())
    }

    /// Parse and dispatch one line under `cmd_lock`, mirroring the original
    /// server's single global lock around command routing.
    async fn route(&self, line: &str) -> String {
        let _guard = self.cmd_lock.lock().await;

        let command = match farm_wire::parse_command(line) {
            Ok(command) => command,
            Err(_) => return farm_wire::unknown_command(line),
        };

        match command {
            Command::Stop => {
                self.shutdown.notify_waiters();
                farm_wire::ok().to_string()
            }
            Command::Log(params) => {
                tracing::info!("{params}");
                farm_wire::ok().to_string()
            }
            Command::TriggerJobs(url) => self.trigger_jobs(&url).await,
            Command::Register(fields) => self.register(&fields).await,
            Command::Status => {
                let entries = self.registry.status_entries().await;
                farm_wire::render_status(&entries)
            }
            Command::Phone { verb, target, args } => self.phone_command(verb, &target, args).await,
            Command::Quit => unreachable!("quit/exit is intercepted before routing"),
            Command::Unknown(verb) => farm_wire::unknown_command(&verb),
        }
    }

    /// `triggerjobs <url>` (spec.md §4.5): fetch/verify the build directly
    /// from the operator-supplied URL and fan it out, bypassing the Event
    /// Normalizer entirely.
    async fn trigger_jobs(&self, build_url: &str) -> String {
        match self.dispatcher.trigger_from_url(build_url).await {
            Ok(job) => {
                if let Err(err) = self.registry.dispatch_to_all(&job).await {
                    tracing::warn!(%build_url, %err, "triggerjobs: dispatch failed");
                }
                farm_wire::ok().to_string()
            }
            Err(err) => {
                tracing::warn!(%build_url, %err, "triggerjobs: could not build job from url");
                farm_wire::ok().to_string()
            }
        }
    }

    async fn register(&self, fields: &RegisterFields) -> String {
        if let Err(err) = self.registry.register(fields).await {
            tracing::warn!(%err, "register: failed");
        }
        farm_wire::ok().to_string()
    }

    /// `disable`/`enable`/`debug`/`ping <phoneid|serial> [args]`: resolve the
    /// target, forward the command to its worker, and reply `error: phone
    /// not found` if no worker matches.
    async fn phone_command(&self, verb: PhoneVerb, target: &str, args: Option<String>) -> String {
        let Some(phoneid) = self.registry.find(target).await else {
            return farm_wire::error_phone_not_found().to_string();
        };

        let command = match verb {
            PhoneVerb::Disable => WorkerCommand::Disable(args),
            PhoneVerb::Enable => WorkerCommand::Enable,
            PhoneVerb::Debug => WorkerCommand::Debug(args),
            PhoneVerb::Ping => WorkerCommand::Ping(args),
        };

        if let Err(err) = self.registry.send_command(&phoneid, command).await {
            tracing::warn!(%err, %phoneid, "phone command failed");
        }
        farm_wire::ok().to_string()
    }
}

#[cfg(test)]
#[path = "command_server_tests.rs"]
mod tests;
