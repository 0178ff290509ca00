//! Buffer channel — collects replies in memory.
//!
//! Used by hosts that return a whole turn's replies at once, and by tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Records every reply; optionally fails after a number of sends.
#[derive(Debug, Default)]
pub struct BufferChannel {
    inbound: Mutex<Vec<IncomingMessage>>,
    sent: Mutex<Vec<String>>,
    fail_after: Option<usize>,
    completed_turns: AtomicUsize,
}

impl BufferChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose `start` stream yields `messages`, then ends.
    pub fn with_inbound(messages: Vec<IncomingMessage>) -> Self {
        Self {
            inbound: Mutex::new(messages),
            ..Self::default()
        }
    }

    /// A channel whose sends fail once `n` replies have been delivered.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Remove and return the replies delivered so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent())
    }

    /// How many turns the host has finished on this channel.
    pub fn completed_turns(&self) -> usize {
        self.completed_turns.load(Ordering::SeqCst)
    }

    // A panic while holding the lock cannot leave the Vec half-written.
    fn sent(&self) -> MutexGuard<'_, Vec<String>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Channel for BufferChannel {
    fn name(&self) -> &str {
        "buffer"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let inbound = std::mem::take(
            &mut *self.inbound.lock().unwrap_or_else(PoisonError::into_inner),
        );
        Ok(Box::pin(stream::iter(inbound)))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let mut sent = self.sent();
        if self.fail_after.is_some_and(|n| sent.len() >= n) {
            return Err(ChannelError::SendFailed {
                name: self.name().to_string(),
                reason: "send limit reached".to_string(),
            });
        }
        sent.push(response.content);
        Ok(())
    }

    async fn end_turn(&self, _msg: &IncomingMessage) -> Result<(), ChannelError> {
        self.completed_turns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
