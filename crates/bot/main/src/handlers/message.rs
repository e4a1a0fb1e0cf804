use std::sync::Arc;

use bot_core::bot::TgBot;
use bot_core::callback_data::Calldata as _;
use bot_core::ERROR;
use club::Club;
use env::Env;
use eyre::Result;
use log::{error, warn};
use model::account::{Account, AccountName, ModerationStatus};
use model::decimal::Decimal;
use payment::{ProviderKind, ProviderRegistry};
use teloxide::{
    prelude::ResponseResult,
    types::{ChatId, InlineKeyboardMarkup, Message, SuccessfulPayment, User},
    utils::markdown::escape,
};

use super::{settle_payment, InvoicePayload, PayCallback, VoteCallback};
use crate::tariffs::parse_tariffs;

const PENDING_MESSAGE: &str = "Ваша заявка на рассмотрении\\. Мы сообщим о решении\\.";
const RESUBMITTED_MESSAGE: &str = "Заявка отправлена повторно\\. Мы сообщим о решении\\.";
const COOLDOWN_MESSAGE: &str =
    "Заявка была отклонена\\. Повторная подача будет доступна позже\\.";
const CHOOSE_TARIFF_MESSAGE: &str = "Выберите срок подписки:";
const NO_PAYMENTS_MESSAGE: &str = "Оплата временно недоступна\\. Попробуйте позже\\.";
const HINT_MESSAGE: &str = "Отправьте /start, чтобы открыть меню\\.";

pub async fn message_handler(
    msg: Message,
    env: Env,
    club: Arc<Club>,
    tg: Arc<TgBot>,
    providers: ProviderRegistry,
) -> ResponseResult<()> {
    if let Err(err) = inner_message_handler(&msg, &env, &club, &tg, &providers).await {
        error!("Failed to handle message: {:#}", err);
        tg.notify(msg.chat.id, ERROR).await;
    }
    Ok(())
}

async fn inner_message_handler(
    msg: &Message,
    env: &Env,
    club: &Club,
    tg: &TgBot,
    providers: &ProviderRegistry,
) -> Result<()> {
    let user = match &msg.from {
        Some(user) if !user.is_bot => user,
        _ => return Ok(()),
    };

    if let Some(payment) = msg.successful_payment() {
        return handle_successful_payment(user, payment, club, tg).await;
    }

    match msg.text() {
        Some("/start") => onboarding(msg.chat.id, user, env, club, tg, providers).await,
        Some(text) if text.starts_with("/ban") || text.starts_with("/unban") => {
            block_command(msg.chat.id, user, text, env, club, tg).await
        }
        _ => {
            tg.send_msg(msg.chat.id, HINT_MESSAGE).await?;
            Ok(())
        }
    }
}

/// `/start` is the whole command surface for members: it registers an
/// application, reports moderation progress or shows the subscription,
/// whichever matches the account state.
async fn onboarding(
    chat_id: ChatId,
    user: &User,
    env: &Env,
    club: &Club,
    tg: &TgBot,
    providers: &ProviderRegistry,
) -> Result<()> {
    let name = AccountName {
        tg_user_name: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    };
    let mut session = club.db.start_session().await?;
    let (account, created) = club
        .accounts
        .create(&mut session, user.id.0 as i64, name)
        .await?;

    match account.moderation.status {
        ModerationStatus::Pending => {
            if created {
                fan_out_vote_request(env, tg, &account).await;
            }
            tg.send_msg(chat_id, PENDING_MESSAGE).await?;
        }
        ModerationStatus::Approved => {
            show_subscription(chat_id, &account, env, tg, providers).await?;
        }
        ModerationStatus::Rejected => {
            let reopened = club.moderation.resubmit(&mut session, account.tg_id).await?;
            if reopened {
                fan_out_vote_request(env, tg, &account).await;
                tg.send_msg(chat_id, RESUBMITTED_MESSAGE).await?;
            } else {
                tg.send_msg(chat_id, COOLDOWN_MESSAGE).await?;
            }
        }
    }
    Ok(())
}

async fn show_subscription(
    chat_id: ChatId,
    account: &Account,
    env: &Env,
    tg: &TgBot,
    providers: &ProviderRegistry,
) -> Result<()> {
    if account.subscription.active {
        let until = account.subscription.expires_at.format("%d.%m.%Y").to_string();
        let text = format!(
            "Подписка активна до {}\\.\nКанал: {}",
            escape(&until),
            escape(env.channel_link())
        );
        tg.send_msg(chat_id, &text).await?;
        return Ok(());
    }

    let kind = match preferred_kind(providers) {
        Some(kind) => kind,
        None => {
            tg.send_msg(chat_id, NO_PAYMENTS_MESSAGE).await?;
            return Ok(());
        }
    };

    let mut rows = vec![];
    for tariff in parse_tariffs(env.tariffs())? {
        let label = format!("{} за {} ₽", tariff.title(), tariff.price);
        rows.push(
            PayCallback {
                kind,
                period: tariff.period,
            }
            .btn_row(label),
        );
    }
    tg.send_msg_with_markup(chat_id, CHOOSE_TARIFF_MESSAGE, InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

fn preferred_kind(providers: &ProviderRegistry) -> Option<ProviderKind> {
    if providers.get(ProviderKind::Tg).is_some() {
        return Some(ProviderKind::Tg);
    }
    providers.kinds().next()
}

/// One message per admin with the applicant's name and the verdict
/// buttons. A failure for one admin does not stop the others.
async fn fan_out_vote_request(env: &Env, tg: &TgBot, account: &Account) {
    let text = format!(
        "Новая заявка на вступление: {}",
        escape(&display_name(&account.name))
    );
    let keymap = InlineKeyboardMarkup::new(vec![vec![
        VoteCallback {
            applicant: account.tg_id,
            approved: true,
        }
        .button("✅ Принять"),
        VoteCallback {
            applicant: account.tg_id,
            approved: false,
        }
        .button("❌ Отклонить"),
    ]]);

    for admin in env.admins() {
        if let Err(err) = tg
            .send_msg_with_markup(ChatId(*admin), &text, keymap.clone())
            .await
        {
            warn!("Failed to notify admin {}: {:#}", admin, err);
        }
    }
}

fn display_name(name: &AccountName) -> String {
    match (&name.tg_user_name, &name.last_name) {
        (Some(username), _) => format!("{} (@{})", name.first_name, username),
        (None, Some(last_name)) => format!("{} {}", name.first_name, last_name),
        (None, None) => name.first_name.clone(),
    }
}

async fn handle_successful_payment(
    user: &User,
    payment: &SuccessfulPayment,
    club: &Club,
    tg: &TgBot,
) -> Result<()> {
    let payload = match InvoicePayload::from_data(&payment.invoice_payload) {
        Some(payload) => payload,
        None => {
            warn!("Unknown invoice payload: {}", payment.invoice_payload);
            return Ok(());
        }
    };

    settle_payment(
        club,
        tg,
        user.id.0 as i64,
        ProviderKind::Tg,
        Decimal::from_minor_units(payment.total_amount as i64),
        payload.period,
        payment.telegram_payment_charge_id.clone(),
    )
    .await
}

async fn block_command(
    chat_id: ChatId,
    user: &User,
    text: &str,
    env: &Env,
    club: &Club,
    tg: &TgBot,
) -> Result<()> {
    if !env.is_admin(user.id.0 as i64) {
        return Ok(());
    }

    let mut parts = text.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let target = match parts.next().and_then(|id| id.parse::<i64>().ok()) {
        Some(id) => id,
        None => {
            tg.send_msg(chat_id, "Формат: /ban id или /unban id").await?;
            return Ok(());
        }
    };

    let blocked = command == "/ban";
    let mut session = club.db.start_session().await?;
    let changed = club
        .accounts
        .set_blocked(&mut session, target, blocked)
        .await?;
    let reply = match (changed, blocked) {
        (true, true) => "Пользователь заблокирован\\.",
        (true, false) => "Пользователь разблокирован\\.",
        (false, _) => "Пользователь не найден или уже в этом состоянии\\.",
    };
    tg.send_msg(chat_id, reply).await?;
    Ok(())
}
