//! Repeating "typing" indicator for one in-flight message.
//!
//! [`PresenceSignaler::start`] spawns a task that notifies the transport
//! immediately and then once per interval. The returned [`PresenceHandle`]
//! owns the task's cancellation token; cancelling is idempotent and dropping
//! the handle cancels too, so the signal cannot outlive the invocation that
//! started it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::{ConversationId, Transport};

/// Default interval between typing notifications.
pub const DEFAULT_PRESENCE_INTERVAL: Duration = Duration::from_secs(3);

/// Starts typing indicators on a transport.
#[derive(Clone)]
pub struct PresenceSignaler {
    transport: Arc<dyn Transport>,
    interval: Duration,
    /// Handles stopped so far, shared with every handle this signaler starts.
    cancellations: Arc<AtomicU64>,
}

impl PresenceSignaler {
    pub fn new(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            transport,
            interval: interval.max(Duration::from_millis(1)),
            cancellations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of started indicators that have been stopped, by `cancel`,
    /// `finish` or drop. Each handle counts once.
    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// Start signalling `conversation` until the handle is cancelled.
    pub fn start(&self, conversation: ConversationId) -> PresenceHandle {
        let token = CancellationToken::new();
        let stop = token.clone();
        let transport = Arc::clone(&self.transport);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    () = stop.cancelled() => break,
                    _ = interval.tick() => {
                        match transport.send_typing(conversation).await {
                            Ok(()) => debug!(chat_id = %conversation, "Sent typing action"),
                            Err(e) => debug!(
                                chat_id = %conversation,
                                channel = transport.name(),
                                "Failed to send typing action: {e}"
                            ),
                        }
                    }
                }
            }
            debug!(chat_id = %conversation, "Typing action cancelled");
        });

        PresenceHandle {
            token,
            task: Some(task),
            cancellations: Some(Arc::clone(&self.cancellations)),
        }
    }
}

impl std::fmt::Debug for PresenceSignaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSignaler")
            .field("transport", &self.transport.name())
            .field("interval", &self.interval)
            .field("cancellations", &self.cancellations())
            .finish()
    }
}

/// Exclusive owner of one running typing indicator.
#[derive(Debug)]
pub struct PresenceHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    cancellations: Option<Arc<AtomicU64>>,
}

impl PresenceHandle {
    /// A handle with nothing running. Cancelling it is a no-op.
    pub fn inactive() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self {
            token,
            task: None,
            cancellations: None,
        }
    }

    /// Stop the indicator. Returns `true` only for the call that actually
    /// performed the cancellation.
    pub fn cancel(&mut self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        if let Some(counter) = &self.cancellations {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A clone of the cancellation token, for observers.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel and wait for the task to finish its current tick.
    pub async fn finish(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!("Typing indicator task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for PresenceHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
