// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AMQP-over-TLS connection to the upstream build/job-action exchanges.
//!
//! The reconnect-and-backoff loop lives in the engine's Pulse Monitor; this
//! module only owns the connection and per-queue drain primitive it calls.

use crate::error::AdapterError;
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PulseMessage {
    pub routing_key: String,
    pub payload: Vec<u8>,
}

/// A queue binding request, matching spec.md §4.1's two exchange kinds.
#[derive(Debug, Clone)]
pub struct Binding {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
    pub durable: bool,
}

/// One long-lived AMQP connection and its bound queues.
#[async_trait]
pub trait PulseSession: Send + Sync {
    async fn bind(&self, binding: &Binding) -> Result<(), AdapterError>;

    /// Drain available messages on `queue`, waiting up to `timeout`.
    /// Socket timeouts are not an error: an empty `Vec` is returned.
    async fn drain(&self, queue: &str, timeout: Duration) -> Result<Vec<PulseMessage>, AdapterError>;
}

#[async_trait]
pub trait PulseClient: Send + Sync + 'static {
    async fn connect(&self, amqp_url: &str) -> Result<Box<dyn PulseSession>, AdapterError>;
}

pub struct LapinPulseClient;

#[async_trait]
impl PulseClient for LapinPulseClient {
    async fn connect(&self, amqp_url: &str) -> Result<Box<dyn PulseSession>, AdapterError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Ok(Box::new(LapinPulseSession { _connection: connection, channel }))
    }
}

struct LapinPulseSession {
    _connection: Connection,
    channel: Channel,
}

#[async_trait]
impl PulseSession for LapinPulseSession {
    async fn bind(&self, binding: &Binding) -> Result<(), AdapterError> {
        self.channel
            .exchange_declare(
                &binding.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_declare(
                &binding.queue,
                QueueDeclareOptions {
                    durable: binding.durable,
                    auto_delete: !binding.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_bind(
                &binding.queue,
                &binding.exchange,
                &binding.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn drain(&self, queue: &str, timeout: Duration) -> Result<Vec<PulseMessage>, AdapterError> {
        let mut consumer = self
            .channel
            .basic_consume(
                queue,
                "autophone",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let mut messages = Vec::new();
        loop {
            match tokio::time::timeout(timeout, consumer.next()).await {
                Ok(Some(Ok(delivery))) => {
                    let routing_key = delivery.routing_key.to_string();
                    let payload = delivery.data.clone();
                    delivery.ack(BasicAckOptions::default()).await?;
                    messages.push(PulseMessage { routing_key, payload });
                }
                Ok(Some(Err(err))) => return Err(AdapterError::Amqp(err)),
                Ok(None) => break,
                Err(_elapsed) => break,
            }
        }
        Ok(messages)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, Binding, PulseClient, PulseMessage, PulseSession};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeState {
        bindings: Vec<Binding>,
        queued: std::collections::HashMap<String, VecDeque<PulseMessage>>,
    }

    #[derive(Clone, Default)]
    pub struct FakePulseSession {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakePulseSession {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, queue: &str, message: PulseMessage) {
            self.inner
                .lock()
                .queued
                .entry(queue.to_string())
                .or_default()
                .push_back(message);
        }

        pub fn bindings(&self) -> Vec<Binding> {
            self.inner.lock().bindings.clone()
        }
    }

    #[async_trait]
    impl PulseSession for FakePulseSession {
        async fn bind(&self, binding: &Binding) -> Result<(), AdapterError> {
            self.inner.lock().bindings.push(binding.clone());
            Ok(())
        }

        async fn drain(&self, queue: &str, _timeout: Duration) -> Result<Vec<PulseMessage>, AdapterError> {
            let mut state = self.inner.lock();
            Ok(state.queued.entry(queue.to_string()).or_default().drain(..).collect())
        }
    }

    #[derive(Clone, Default)]
    pub struct FakePulseClient {
        pub session: FakePulseSession,
    }

    impl FakePulseClient {
        pub fn new(session: FakePulseSession) -> Self {
            Self { session }
        }
    }

    #[async_trait]
    impl PulseClient for FakePulseClient {
        async fn connect(&self, _amqp_url: &str) -> Result<Box<dyn PulseSession>, AdapterError> {
            Ok(Box::new(self.session.clone()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePulseClient, FakePulseSession};

#[cfg(test)]
#[path = "pulse_tests.rs"]
mod tests;
