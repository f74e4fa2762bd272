//! Wait-for-message registry.
//!
//! A task that needs "the next message matching P, within T" registers a
//! predicate here and suspends; the dispatcher feeds every inbound message
//! through [`Waiters::deliver`] before command routing. Dropping the wait
//! future (e.g. a tunnel kill cancelling its pending wait) unregisters the
//! predicate immediately, so cancellation is prompt rather than waiting for
//! the next timeout.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::trace;

use burrow_models::Message;

use crate::error::{PlatformError, Result};

type Predicate = Box<dyn Fn(&Message) -> bool + Send + Sync>;

struct Waiter {
    id: u64,
    predicate: Predicate,
    tx: Option<oneshot::Sender<Message>>,
}

#[derive(Default)]
struct Table {
    next_id: u64,
    waiters: Vec<Waiter>,
}

/// Registry of outstanding message waits.
#[derive(Default)]
pub struct Waiters {
    table: Mutex<Table>,
}

impl Waiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding waits.
    pub fn pending(&self) -> usize {
        self.table.lock().unwrap().waiters.len()
    }

    /// Offer an inbound message to every outstanding wait. Each wait whose
    /// predicate matches is completed with a clone of the message and
    /// removed.
    pub fn deliver(&self, message: &Message) {
        let mut table = self.table.lock().unwrap();
        let before = table.waiters.len();
        table.waiters.retain_mut(|waiter| {
            if (waiter.predicate)(message) {
                if let Some(tx) = waiter.tx.take() {
                    let _ = tx.send(message.clone());
                }
                false
            } else {
                true
            }
        });
        let completed = before - table.waiters.len();
        if completed > 0 {
            trace!(channel = %message.channel.id, completed, "message completed waits");
        }
    }

    /// Wait for the next message matching `predicate`, up to `timeout`.
    ///
    /// Returns [`PlatformError::Timeout`] on expiry. Dropping the returned
    /// future unregisters the wait.
    pub async fn wait_for<P>(&self, predicate: P, timeout: Duration) -> Result<Message>
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut table = self.table.lock().unwrap();
            let id = table.next_id;
            table.next_id += 1;
            table.waiters.push(Waiter {
                id,
                predicate: Box::new(predicate),
                tx: Some(tx),
            });
            id
        };

        let _guard = Unregister { waiters: self, id };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(message)) => Ok(message),
            // Elapsed, or the registry itself went away.
            Ok(Err(_)) | Err(_) => Err(PlatformError::Timeout),
        }
    }
}

/// Removes a wait entry when its future is dropped or completes.
struct Unregister<'a> {
    waiters: &'a Waiters,
    id: u64,
}

impl Drop for Unregister<'_> {
    fn drop(&mut self) {
        let mut table = self.waiters.table.lock().unwrap();
        table.waiters.retain(|w| w.id != self.id);
    }
}
