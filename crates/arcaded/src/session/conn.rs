//! Connection handles as seen from a session actor
//!
//! The actor never touches sockets. It holds a [`ConnHandle`] per attached
//! connection: a bounded message queue drained by the connection's writer
//! task, plus an out-of-band close channel that bypasses the queue so a
//! close can always be delivered, even to a slow consumer.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use arcade_core::protocol::{CloseReason, ServerMessage};

/// Process-wide connection identifier
pub type ConnId = u64;

/// Result of a non-blocking send to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Bounded queue overflowed: the consumer is too slow
    Full,
    /// Writer task is gone
    Closed,
}

/// Actor-side handle to one connection's writer
#[derive(Debug, Clone)]
pub struct ConnHandle {
    pub id: ConnId,
    msg_tx: mpsc::Sender<ServerMessage>,
    close_tx: mpsc::Sender<CloseReason>,
}

impl ConnHandle {
    pub fn new(
        id: ConnId,
        msg_tx: mpsc::Sender<ServerMessage>,
        close_tx: mpsc::Sender<CloseReason>,
    ) -> Self {
        Self {
            id,
            msg_tx,
            close_tx,
        }
    }

    /// Queue a message without blocking the actor
    pub fn send(&self, message: ServerMessage) -> SendOutcome {
        match self.msg_tx.try_send(message) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(_)) => SendOutcome::Full,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Ask the writer to close the socket. Idempotent; extra requests are
    /// dropped once one is queued.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.close_tx.try_send(reason);
    }
}

/// Build a handle plus the receiver ends for a writer task (or a test)
pub fn conn_channel(
    id: ConnId,
    queue_size: usize,
) -> (
    ConnHandle,
    mpsc::Receiver<ServerMessage>,
    mpsc::Receiver<CloseReason>,
) {
    let (msg_tx, msg_rx) = mpsc::channel(queue_size);
    let (close_tx, close_rx) = mpsc::channel(1);
    (ConnHandle::new(id, msg_tx, close_tx), msg_rx, close_rx)
}
