use std::sync::Arc;
use std::time::Duration;

use club::Club;
use eyre::{eyre, Result};
use log::{error, warn};
use model::notification::OutboxJob;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};

use crate::notifier::Notifier;

const POLL_INTERVAL: Duration = Duration::from_secs(30);
const SEND_BUDGET: u32 = 3;

/// Spawns the delivery worker. It drains the outbox on a timer and
/// whenever [`club::service::outbox::Outbox::nudge`] fires, so
/// notifications usually leave right after the transaction that queued
/// them commits.
pub fn spawn(club: Club, notifier: Arc<dyn Notifier>, mut wake: mpsc::Receiver<()>) {
    tokio::spawn(async move {
        let mut tick = interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                received = wake.recv() => {
                    if received.is_none() {
                        return;
                    }
                }
            }
            if let Err(err) = process(&club, notifier.as_ref()).await {
                error!("Delivery pass failed: {:#}", err);
            }
        }
    });
}

async fn process(club: &Club, notifier: &dyn Notifier) -> Result<()> {
    let mut session = club.db.start_session().await?;
    let jobs = club.outbox.to_send(&mut session).await?;
    drop(session);

    for job in jobs {
        if let Err(err) = handle_job(club, notifier, &job).await {
            error!("Failed to deliver {:?}: {:#}", job.notification, err);
        }
    }
    Ok(())
}

async fn handle_job(club: &Club, notifier: &dyn Notifier, job: &OutboxJob) -> Result<()> {
    let mut session = club.db.start_session().await?;
    let account = club
        .accounts
        .get(&mut session, job.to)
        .await?
        .ok_or_else(|| eyre!("Account not found: {}", job.to))?;

    if account.blocked {
        club.outbox
            .mark_failed(&mut session, job.id, job.attempts)
            .await?;
        return Ok(());
    }

    match deliver(notifier, account.tg_id, &job.message, SEND_BUDGET).await {
        Some(spent) => {
            club.outbox
                .mark_sent(&mut session, job.id, job.attempts + spent)
                .await?;
        }
        None => {
            club.outbox
                .mark_failed(&mut session, job.id, job.attempts + SEND_BUDGET)
                .await?;
            if job.notification.blocks_on_failure() {
                club.accounts
                    .set_blocked(&mut session, account.tg_id, true)
                    .await?;
                warn!("Blocked unreachable account:{}", account.tg_id);
            }
        }
    }
    Ok(())
}

/// Tries to hand the message to Telegram up to `budget` times with a
/// growing pause in between. Returns the number of attempts spent, or
/// None once the budget is gone.
pub async fn deliver(notifier: &dyn Notifier, tg_id: i64, text: &str, budget: u32) -> Option<u32> {
    for attempt in 1..=budget {
        if notifier.send(tg_id, text).await {
            return Some(attempt);
        }
        if attempt < budget {
            sleep(backoff(attempt)).await;
        }
    }
    None
}

/// Pause after a failed attempt number `attempt`.
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500) * attempt
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FakeNotifier {
        calls: AtomicU32,
        succeed_on: u32,
    }

    impl FakeNotifier {
        fn new(succeed_on: u32) -> Self {
            FakeNotifier {
                calls: AtomicU32::new(0),
                succeed_on,
            }
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send(&self, _tg_id: i64, _text: &str) -> bool {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.succeed_on != 0 && call >= self.succeed_on
        }
    }

    #[tokio::test]
    async fn delivers_on_first_attempt() {
        let notifier = FakeNotifier::new(1);
        assert_eq!(deliver(&notifier, 1, "hi", 3).await, Some(1));
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let notifier = FakeNotifier::new(3);
        assert_eq!(deliver(&notifier, 1, "hi", 3).await, Some(3));
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let notifier = FakeNotifier::new(0);
        assert_eq!(deliver(&notifier, 1, "hi", 3).await, None);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_grows() {
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert!(backoff(1) < backoff(2));
        assert!(backoff(2) < backoff(3));
    }
}
