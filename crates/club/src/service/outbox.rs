use std::ops::Deref;

use bson::oid::ObjectId;
use eyre::Result;
use log::debug;
use model::notification::{NotificationId, OutboxJob};
use model::session::Session;
use storage::outbox::OutboxStore;
use tokio::sync::mpsc;

/// Durable notification queue plus a wake channel for the delivery
/// worker.
#[derive(Clone)]
pub struct Outbox {
    store: OutboxStore,
    wake: mpsc::Sender<()>,
}

impl Outbox {
    pub(crate) fn new(store: OutboxStore, wake: mpsc::Sender<()>) -> Self {
        Outbox { store, wake }
    }

    /// Queues a notification inside the caller's transaction. The job id
    /// is derived from the event, so replaying the same event is a no-op.
    pub async fn enqueue(
        &self,
        session: &mut Session,
        to: ObjectId,
        message: String,
        notification: NotificationId,
    ) -> Result<()> {
        let job = OutboxJob::new(to, message, notification);
        if !self.store.insert(session, &job).await? {
            debug!("Notification already queued: {:?}", job.notification);
        }
        Ok(())
    }

    /// Wakes the delivery worker without blocking. Call after the
    /// enqueueing transaction commits, not inside it.
    pub fn nudge(&self) {
        let _ = self.wake.try_send(());
    }
}

impl Deref for Outbox {
    type Target = OutboxStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
