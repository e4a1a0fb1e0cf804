use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use log::info;
use model::decimal::Decimal;
use model::notification::NotificationId;
use model::payment::PaymentRecord;
use model::period::Period;
use model::session::Session;
use storage::payments::PaymentStore;
use thiserror::Error;
use tx_macro::tx;

use super::accounts::Accounts;
use super::outbox::Outbox;

const WARNING_MESSAGE: &str =
    "Подписка истекает завтра. Продлите её, чтобы сохранить доступ к каналу.";
const ENDED_MESSAGE: &str = "Срок подписки истёк. Доступ к каналу закрыт до продления.";

#[derive(Clone)]
pub struct Billing {
    accounts: Accounts,
    payments: PaymentStore,
    outbox: Outbox,
    channel_link: String,
}

#[derive(Debug, Error)]
pub enum ConfirmPaymentError {
    #[error("Account not found: {0}")]
    UnknownAccount(i64),
    #[error("Payment {0} already recorded")]
    AlreadyRecorded(String),
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for ConfirmPaymentError {
    fn from(err: mongodb::error::Error) -> Self {
        ConfirmPaymentError::Common(err.into())
    }
}

impl Billing {
    pub(crate) fn new(
        accounts: Accounts,
        payments: PaymentStore,
        outbox: Outbox,
        channel_link: String,
    ) -> Self {
        Billing {
            accounts,
            payments,
            outbox,
            channel_link,
        }
    }

    /// Records a confirmed payment and extends the subscription by the paid
    /// period. An unexpired subscription is extended from its current end,
    /// an expired or missing one from now. Providers that report the same
    /// payment twice hit [`ConfirmPaymentError::AlreadyRecorded`].
    #[tx]
    pub async fn confirm_payment(
        &self,
        session: &mut Session,
        tg_id: i64,
        provider: &str,
        amount: Decimal,
        period: Period,
        external_id: Option<String>,
    ) -> Result<DateTime<Utc>, ConfirmPaymentError> {
        let account = self
            .accounts
            .get_by_tg_id(session, tg_id)
            .await?
            .ok_or(ConfirmPaymentError::UnknownAccount(tg_id))?;

        if let Some(external_id) = &external_id {
            if self.payments.exists(session, external_id).await? {
                return Err(ConfirmPaymentError::AlreadyRecorded(external_id.clone()));
            }
        }

        let now = Utc::now();
        let base = if account.subscription.active && account.subscription.expires_at > now {
            account.subscription.expires_at
        } else {
            now
        };
        let until = base + period.duration();

        self.accounts
            .grant_subscription(session, account.id, until)
            .await?;
        let record = PaymentRecord::new(
            account.id,
            provider.to_owned(),
            amount,
            period,
            external_id,
        );
        self.payments.add(session, &record).await?;

        let message = format!(
            "Подписка активна до {}.\nКанал: {}",
            until.format("%d.%m.%Y"),
            self.channel_link
        );
        self.outbox
            .enqueue(
                session,
                account.id,
                message,
                NotificationId::SubscriptionGranted {
                    account: account.id,
                    until,
                },
            )
            .await?;

        info!(
            "Extended subscription for account:{} until {} via {}",
            tg_id, until, provider
        );
        Ok(until)
    }

    /// Queues the one-time expiry notice. Returns false when the
    /// subscription is gone or the notice already went out, so concurrent
    /// sweeps cannot double-send.
    #[tx]
    pub async fn send_expiry_warning(&self, session: &mut Session, id: ObjectId) -> Result<bool> {
        let account = self
            .accounts
            .get(session, id)
            .await?
            .ok_or_else(|| eyre!("Account not found: {}", id))?;

        if !account.subscription.active || account.subscription.warning_sent {
            return Ok(false);
        }
        if !self.accounts.set_warning_sent(session, id).await? {
            return Ok(false);
        }

        self.outbox
            .enqueue(
                session,
                id,
                WARNING_MESSAGE.to_owned(),
                NotificationId::ExpiryWarning {
                    account: id,
                    expires_at: account.subscription.expires_at,
                },
            )
            .await?;
        Ok(true)
    }

    /// Deactivates an expired subscription. The channel revoke happens
    /// before this call, so a crash in between leaves the account active
    /// and the next sweep revokes again, which the channel API tolerates.
    #[tx]
    pub async fn finish_expired(&self, session: &mut Session, id: ObjectId) -> Result<bool> {
        let account = self
            .accounts
            .get(session, id)
            .await?
            .ok_or_else(|| eyre!("Account not found: {}", id))?;

        if !account.subscription.active {
            return Ok(false);
        }
        if !self.accounts.expire_subscription(session, id).await? {
            return Ok(false);
        }

        self.outbox
            .enqueue(
                session,
                id,
                ENDED_MESSAGE.to_owned(),
                NotificationId::SubscriptionEnded {
                    account: id,
                    expires_at: account.subscription.expires_at,
                },
            )
            .await?;
        info!("Finished expired subscription for account:{}", id);
        Ok(true)
    }
}
