// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort crash/notification email, configured from `email.ini`.
//!
//! Failures here are always swallowed by the caller (spec.md §7): the
//! `Result` exists so the caller can log it, never so it can retry.

use crate::error::AdapterError;
use crate::ini::{get, parse_ini};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_addr: String,
    pub to_addrs: Vec<String>,
}

pub fn load_mailer_config(contents: &str) -> Result<MailerConfig, AdapterError> {
    let doc = parse_ini(contents);
    let require = |key: &str| -> Result<String, AdapterError> {
        get(&doc, "email", key)
            .map(str::to_string)
            .ok_or_else(|| AdapterError::MissingIniKey {
                section: "email".to_string(),
                key: key.to_string(),
            })
    };

    Ok(MailerConfig {
        smtp_host: require("smtp_host")?,
        smtp_port: require("smtp_port")?.parse().unwrap_or(25),
        from_addr: require("from")?,
        to_addrs: require("to")?.split(',').map(|s| s.trim().to_string()).collect(),
    })
}

/// Sends a subject-prefixed plaintext notification email.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AdapterError>;
}

/// Minimal SMTP client speaking just enough of RFC 5321 to hand off one
/// plaintext message: `HELO`/`MAIL FROM`/`RCPT TO`/`DATA`/`QUIT`. No TLS, no
/// auth — sufficient for a local relay, which is all this daemon has ever
/// targeted.
pub struct SmtpMailer {
    config: MailerConfig,
    subject_prefix: String,
}

impl SmtpMailer {
    pub fn new(config: MailerConfig, subject_prefix: impl Into<String>) -> Self {
        Self {
            config,
            subject_prefix: subject_prefix.into(),
        }
    }

    async fn expect_code(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>, expected: &str) -> Result<(), AdapterError> {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        if !line.starts_with(expected) {
            return Err(AdapterError::Smtp(format!("unexpected response: {line}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AdapterError> {
        let stream = TcpStream::connect((self.config.smtp_host.as_str(), self.config.smtp_port))
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        Self::expect_code(&mut reader, "220").await?;

        write_half
            .write_all(b"HELO autophone\r\n")
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        Self::expect_code(&mut reader, "250").await?;

        write_half
            .write_all(format!("MAIL FROM:<{}>\r\n", self.config.from_addr).as_bytes())
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        Self::expect_code(&mut reader, "250").await?;

        for to in &self.config.to_addrs {
            write_half
                .write_all(format!("RCPT TO:<{to}>\r\n").as_bytes())
                .await
                .map_err(|e| AdapterError::Smtp(e.to_string()))?;
            Self::expect_code(&mut reader, "250").await?;
        }

        write_half
            .write_all(b"DATA\r\n")
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        Self::expect_code(&mut reader, "354").await?;

        let message = format!(
            "Subject: {}{subject}\r\n\r\n{body}\r\n.\r\n",
            self.subject_prefix
        );
        write_half
            .write_all(message.as_bytes())
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        Self::expect_code(&mut reader, "250").await?;

        write_half
            .write_all(b"QUIT\r\n")
            .await
            .map_err(|e| AdapterError::Smtp(e.to_string()))?;
        let mut drain = Vec::new();
        let _ = reader.read_to_end(&mut drain).await;

        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AdapterError, Mailer};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct SentMail {
        pub subject: String,
        pub body: String,
    }

    #[derive(Clone, Default)]
    pub struct FakeMailer {
        sent: Arc<Mutex<Vec<SentMail>>>,
    }

    impl FakeMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, subject: &str, body: &str) -> Result<(), AdapterError> {
            self.sent.lock().push(SentMail {
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMailer, SentMail};

#[cfg(test)]
#[path = "mailer_tests.rs"]
mod tests;
