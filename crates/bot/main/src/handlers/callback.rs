use std::sync::Arc;
use std::time::Duration;

use bot_core::bot::TgBot;
use bot_core::callback_data::Calldata as _;
use bot_core::ERROR;
use club::service::moderation::{CastVoteError, VoteOutcome};
use club::Club;
use env::Env;
use eyre::{eyre, Result};
use log::{error, warn};
use model::vote::Decision;
use payment::{await_completion, Order, PaymentState, ProviderKind, ProviderRegistry};
use teloxide::{
    prelude::{Requester as _, ResponseResult},
    types::{CallbackQuery, ChatId, LabeledPrice},
    utils::markdown::escape,
};

use super::{settle_payment, InvoicePayload, PayCallback, VoteCallback};
use crate::tariffs::{parse_tariffs, Tariff};

const CHECKOUT_STEP: Duration = Duration::from_secs(5);
const CHECKOUT_BUDGET: u32 = 120;

pub async fn callback_handler(
    q: CallbackQuery,
    env: Env,
    club: Arc<Club>,
    tg: Arc<TgBot>,
    providers: ProviderRegistry,
) -> ResponseResult<()> {
    let data = q.data.clone().unwrap_or_default();
    let result = if let Some(vote) = VoteCallback::from_data(&data) {
        handle_vote(&q, vote, &env, &club, &tg).await
    } else if let Some(pay) = PayCallback::from_data(&data) {
        handle_pay(&q, pay, &env, &club, &tg, &providers).await
    } else {
        Ok(())
    };

    if let Err(err) = result {
        error!("Failed to handle callback: {:#}", err);
        if let Some(message) = &q.message {
            tg.notify(message.chat().id, ERROR).await;
        }
    }
    if let Err(err) = tg.answer_callback_query(q.id).await {
        warn!("Failed to answer callback query: {}", err);
    }
    Ok(())
}

async fn handle_vote(
    q: &CallbackQuery,
    vote: VoteCallback,
    env: &Env,
    club: &Club,
    tg: &TgBot,
) -> Result<()> {
    let admin = q.from.id.0 as i64;
    if !env.is_admin(admin) {
        warn!("Vote from non-admin {}", admin);
        return Ok(());
    }

    let mut session = club.db.start_session().await?;
    let outcome = club
        .moderation
        .cast_vote(&mut session, vote.applicant, admin, vote.approved)
        .await;

    let (feedback, decided) = match outcome {
        Ok(VoteOutcome::Applied {
            decision: Decision::Approved,
        }) => ("Заявка одобрена\\.", true),
        Ok(VoteOutcome::Applied {
            decision: Decision::Rejected,
        }) => ("Заявка отклонена\\.", true),
        Ok(VoteOutcome::Applied {
            decision: Decision::Pending,
        }) => ("Голос учтён\\.", false),
        Ok(VoteOutcome::NoChange) => ("Заявка уже рассмотрена\\.", true),
        Err(CastVoteError::UnknownApplicant(_)) => ("Заявка не найдена\\.", true),
        Err(CastVoteError::Common(err)) => return Err(err),
    };
    if decided {
        club.outbox.nudge();
        // The stale verdict buttons go away, further admins see the ack
        // through their own taps.
        if let Some(message) = &q.message {
            if let Err(err) = tg.delete_msg(message.chat().id, message.id()).await {
                warn!("Failed to delete vote message: {:#}", err);
            }
        }
    }
    if let Some(message) = &q.message {
        tg.notify(message.chat().id, feedback).await;
    }
    Ok(())
}

async fn handle_pay(
    q: &CallbackQuery,
    pay: PayCallback,
    env: &Env,
    club: &Arc<Club>,
    tg: &Arc<TgBot>,
    providers: &ProviderRegistry,
) -> Result<()> {
    let chat_id = match &q.message {
        Some(message) => message.chat().id,
        None => return Ok(()),
    };
    let tg_id = q.from.id.0 as i64;

    let tariffs = parse_tariffs(env.tariffs())?;
    let tariff = match tariffs.iter().find(|tariff| tariff.period == pay.period) {
        Some(tariff) => *tariff,
        None => {
            tg.send_msg(chat_id, "Этот тариф больше недоступен\\.").await?;
            return Ok(());
        }
    };

    let order = Order {
        tg_id,
        amount: tariff.price,
        period: tariff.period,
        description: format!("Подписка на {}", tariff.title()),
    };
    match pay.kind {
        ProviderKind::Tg => send_invoice(chat_id, &order, &tariff, env, tg).await,
        ProviderKind::YooKassa => {
            start_redirect_checkout(chat_id, order, pay.kind, club, tg, providers).await
        }
    }
}

/// Telegram rail: the invoice message itself is the checkout, the
/// confirmation comes back as a `successful_payment` message.
async fn send_invoice(
    chat_id: ChatId,
    order: &Order,
    tariff: &Tariff,
    env: &Env,
    tg: &TgBot,
) -> Result<()> {
    let token = env
        .payment_provider_token()
        .ok_or_else(|| eyre!("PAYMENT_PROVIDER_TOKEN is not set"))?;
    let payload = InvoicePayload {
        period: order.period,
    };

    tg.send_invoice(
        chat_id,
        "Подписка",
        &order.description,
        payload.to_data(),
        token.to_owned(),
        "RUB",
        vec![LabeledPrice {
            label: tariff.title(),
            amount: order.amount.minor_units() as u32,
        }],
    )
    .await?;
    Ok(())
}

/// Redirect rail: send the checkout link, then poll in the background
/// and settle once the provider reports success.
async fn start_redirect_checkout(
    chat_id: ChatId,
    order: Order,
    kind: ProviderKind,
    club: &Arc<Club>,
    tg: &Arc<TgBot>,
    providers: &ProviderRegistry,
) -> Result<()> {
    let provider = providers
        .get(kind)
        .ok_or_else(|| eyre!("Provider {} is not configured", kind))?;
    let intent = provider.initiate(&order).await?;
    let url = intent
        .redirect_url
        .ok_or_else(|| eyre!("Provider {} returned no redirect url", kind))?;

    let text = format!(
        "Оплатите по ссылке: {}\nПодписка активируется автоматически после оплаты\\.",
        escape(&url)
    );
    tg.send_msg(chat_id, &text).await?;

    let club = club.clone();
    let tg = tg.clone();
    tokio::spawn(async move {
        let state =
            await_completion(provider, &intent.external_id, CHECKOUT_STEP, CHECKOUT_BUDGET).await;
        match state {
            Ok(PaymentState::Succeeded) => {
                let settled = settle_payment(
                    &club,
                    &tg,
                    order.tg_id,
                    kind,
                    order.amount,
                    order.period,
                    intent.external_id,
                )
                .await;
                if let Err(err) = settled {
                    error!("Failed to record payment: {:#}", err);
                }
            }
            Ok(PaymentState::Canceled) => {
                tg.notify(chat_id, "Оплата отменена\\.").await;
            }
            Ok(PaymentState::Pending) => {
                warn!(
                    "Payment {} still pending after polling budget",
                    intent.external_id
                );
            }
            Err(err) => error!("Failed to check payment: {:#}", err),
        }
    });
    Ok(())
}
