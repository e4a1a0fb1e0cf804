pub mod callback;
pub mod message;

use bot_core::bot::TgBot;
use club::service::billing::ConfirmPaymentError;
use club::Club;
use log::info;
use model::decimal::Decimal;
use model::period::Period;
use payment::ProviderKind;
use serde::{Deserialize, Serialize};

/// An admin's verdict button under a join request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct VoteCallback {
    pub applicant: i64,
    pub approved: bool,
}

/// A tariff button under the payment menu.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PayCallback {
    pub kind: ProviderKind,
    pub period: Period,
}

/// Invoice payload for Telegram's own payment rail. The charge id for
/// dedup comes from Telegram, so only the period travels with the
/// invoice.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct InvoicePayload {
    pub period: Period,
}

/// Shared tail of both payment rails: record the payment, reopen the
/// channel and wake the delivery worker. A payment the provider reports
/// twice is logged and dropped.
pub(crate) async fn settle_payment(
    club: &Club,
    tg: &TgBot,
    tg_id: i64,
    kind: ProviderKind,
    amount: Decimal,
    period: Period,
    external_id: String,
) -> Result<(), eyre::Error> {
    let mut session = club.db.start_session().await?;
    let result = club
        .billing
        .confirm_payment(
            &mut session,
            tg_id,
            &kind.to_string(),
            amount,
            period,
            Some(external_id),
        )
        .await;

    match result {
        Ok(_) => {
            tg.readmit_to_channel(tg_id).await?;
            club.outbox.nudge();
            Ok(())
        }
        Err(ConfirmPaymentError::AlreadyRecorded(id)) => {
            info!("Duplicate payment report: {}", id);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
