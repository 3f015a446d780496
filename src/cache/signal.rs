//! Notification hub for "the set of resolvable objects changed".

use std::fmt;

use tokio::sync::broadcast;
use tracing::debug;

/// Buffered notifications per subscriber before older ones are dropped.
const CAPACITY: usize = 16;

/// Why a recache was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecacheReason {
    Startup,
    /// The bot was added to a chat.
    ChatJoined,
    /// The bot left or was removed from a chat.
    ChatLeft,
    Manual,
}

impl fmt::Display for RecacheReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Startup => "startup",
            Self::ChatJoined => "chat joined",
            Self::ChatLeft => "chat left",
            Self::Manual => "manual request",
        };
        f.write_str(text)
    }
}

/// Subscribe/fire handle. Cloning shares the same channel.
#[derive(Clone)]
pub struct RecacheSignal {
    tx: broadcast::Sender<RecacheReason>,
}

impl RecacheSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    /// Notify every subscriber. Returns how many were listening.
    pub fn fire(&self, reason: RecacheReason) -> usize {
        match self.tx.send(reason) {
            Ok(listeners) => {
                debug!(%reason, listeners, "recache requested");
                listeners
            }
            Err(_) => {
                debug!(%reason, "recache requested with no listeners");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecacheReason> {
        self.tx.subscribe()
    }
}

impl Default for RecacheSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecacheSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecacheSignal")
            .field("listeners", &self.tx.receiver_count())
            .finish()
    }
}
