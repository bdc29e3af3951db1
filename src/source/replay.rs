//! Replay channel provider.
//!
//! Replays a fixed sequence of messages, either given in memory or read
//! from a newline-delimited JSON file. Deterministic, so it doubles as
//! the fake channel in tests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::{ChannelEvent, ChannelProvider, Listener};
use crate::error::ChannelError;

/// A provider that pushes a fixed list of messages on every open.
#[derive(Debug)]
pub struct ReplayProvider {
    messages: Arc<Vec<Vec<u8>>>,
    description: String,
    /// When set, `open` waits for a notification before completing.
    gate: Option<Arc<Notify>>,
    /// When set, `open` fails with this reason.
    failure: Option<String>,
    /// Push a `Closed` event after the last message.
    close_when_done: bool,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ReplayProvider {
    /// Create a provider replaying `messages` in order.
    pub fn new(messages: Vec<Vec<u8>>) -> Self {
        let description = format!("replay: {} messages", messages.len());
        Self {
            messages: Arc::new(messages),
            description,
            gate: None,
            failure: None,
            close_when_done: false,
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Load messages from a newline-delimited JSON file, skipping blank lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChannelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ChannelError::Source(format!("{}: {}", path.display(), e)))?;

        let messages = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.as_bytes().to_vec())
            .collect();

        let mut provider = Self::new(messages);
        provider.description = format!("replay: {}", path.display());
        Ok(provider)
    }

    /// Hold every `open` until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make every `open` fail with `reason`.
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Report the channel as closed once all messages are delivered.
    pub fn close_when_done(mut self) -> Self {
        self.close_when_done = true;
        self
    }

    /// Number of times `open` has been called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of channels released through `close`.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Shared counter of `close` calls, readable after the provider is dropped.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }
}

#[async_trait]
impl ChannelProvider for ReplayProvider {
    type Handle = JoinHandle<()>;

    async fn open(&self, listener: Listener) -> Result<Self::Handle, ChannelError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(reason) = &self.failure {
            return Err(ChannelError::Connect(reason.clone()));
        }

        let messages = self.messages.clone();
        let close_when_done = self.close_when_done;

        Ok(tokio::spawn(async move {
            for message in messages.iter() {
                if listener
                    .send(ChannelEvent::Message(message.clone()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            if close_when_done {
                let _ = listener
                    .send(ChannelEvent::Closed(Some("Replay finished".to_string())))
                    .await;
            } else {
                // Hold the listener open until `close` aborts the task.
                std::future::pending::<()>().await;
            }
        }))
    }

    fn close(&self, handle: Self::Handle) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        handle.abort();
    }

    fn description(&self) -> &str {
        &self.description
    }
}
