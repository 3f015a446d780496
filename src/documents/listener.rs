//! Background task rebuilding the emoji cache on recache notifications.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Documents;
use crate::cache::{RecacheReason, RecacheSignal};

/// Spawn the listener. It runs until every sender of `signal` is dropped.
///
/// Notifications that pile up while a rebuild runs are folded into the
/// next rebuild.
pub fn spawn_recache_listener(documents: Arc<Documents>, signal: &RecacheSignal) -> JoinHandle<()> {
    let mut rx = signal.subscribe();

    tokio::spawn(async move {
        loop {
            let reason = match rx.recv().await {
                Ok(reason) => reason,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "recache notifications dropped");
                    RecacheReason::Manual
                }
                Err(RecvError::Closed) => break,
            };

            loop {
                match rx.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }

            info!(%reason, "emoji recache triggered");
            match documents.reload_emoji_cache().await {
                Ok(count) => info!(count, "emoji recache finished"),
                Err(e) => warn!(error = %e, "emoji recache failed"),
            }
        }

        debug!("recache listener stopped");
    })
}
