//! [`Notifier`]-related implementations.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use common::operations::Emit;
use derive_more::{Display, Error as StdError};
use tokio::sync::Mutex;
use tracerr::Traced;
use tracing as log;

use crate::domain::{user, Notification};

/// Delivery of [`Notification`]s.
pub use common::Handler as Notifier;

/// [`Notifier`] error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Notification`] cannot be delivered to its recipient.
    #[display("Cannot deliver `Notification` to `User(id: {_0})`")]
    Undeliverable(#[error(not(source))] user::Id),
}

/// [`Notifier`] writing [`Notification`]s into the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Emit<Notification>> for Log {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Emit(notification): Emit<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        log::info!(
            recipient = %notification.recipient_id,
            event = notification.event.kind(),
            details = ?notification.event,
            "notification",
        );
        Ok(())
    }
}

/// [`Notifier`] collecting [`Notification`]s in memory.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// [`Notification`]s delivered so far.
    sent: Arc<Mutex<Vec<Notification>>>,

    /// Indicator whether deliveries fail.
    failing: Arc<AtomicBool>,
}

impl Memory {
    /// Creates a new empty [`Memory`] notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all the [`Notification`]s delivered so far.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Makes all the following deliveries fail or succeed.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl Notifier<Emit<Notification>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Emit(notification): Emit<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.failing.load(Ordering::Acquire) {
            return Err(tracerr::new!(Error::Undeliverable(
                notification.recipient_id
            )));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
