use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use club::Club;
use eyre::{Error, Result};
use log::{error, info};
use model::account::Account;
use model::sweep::{plan, SweepAction};

use crate::notifier::ChannelMembership;
use crate::Task;

/// Subscription sweep. Sends the one-time end-of-period notice and
/// closes expired subscriptions. Safe to run concurrently with itself:
/// both branches re-check state inside a transaction and back off when
/// another pass got there first.
#[derive(Clone)]
pub struct ExpiryBg {
    club: Club,
    membership: Arc<dyn ChannelMembership>,
    warn_before: Duration,
}

impl ExpiryBg {
    pub fn new(
        club: Club,
        membership: Arc<dyn ChannelMembership>,
        warn_before: Duration,
    ) -> ExpiryBg {
        ExpiryBg {
            club,
            membership,
            warn_before,
        }
    }

    async fn sweep_account(&self, account: &Account) -> Result<()> {
        match plan(&account.subscription, Utc::now(), self.warn_before) {
            SweepAction::Skip => Ok(()),
            SweepAction::Warn => {
                let mut session = self.club.db.start_session().await?;
                let warned = self
                    .club
                    .billing
                    .send_expiry_warning(&mut session, account.id)
                    .await?;
                if warned {
                    info!("Queued expiry warning for account:{}", account.tg_id);
                }
                Ok(())
            }
            SweepAction::Expire => {
                // Revoke first. If we crash before the status flips, the
                // account stays active and the next sweep revokes again,
                // which the channel API tolerates. The restore right after
                // lifts the ban so the member can come back through the
                // invite link once they pay again.
                self.membership.revoke(account.tg_id).await?;
                self.membership.restore(account.tg_id).await?;
                let mut session = self.club.db.start_session().await?;
                let expired = self
                    .club
                    .billing
                    .finish_expired(&mut session, account.id)
                    .await?;
                if expired {
                    info!("Expired subscription for account:{}", account.tg_id);
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Task for ExpiryBg {
    const NAME: &'static str = "expiry";
    const CRON: &'static str = "every 1 minute";

    async fn process(&mut self) -> Result<(), Error> {
        let mut session = self.club.db.start_session().await?;
        let accounts = self
            .club
            .accounts
            .find_active_subscriptions(&mut session)
            .await?;
        drop(session);

        for account in accounts {
            if let Err(err) = self.sweep_account(&account).await {
                error!("Sweep failed for account:{}: {:#}", account.tg_id, err);
            }
        }
        self.club.outbox.nudge();
        Ok(())
    }
}
