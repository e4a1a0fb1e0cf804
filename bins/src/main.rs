use std::sync::Arc;

use bg_process::process::expiry::ExpiryBg;
use bg_process::process::outbox_gc::OutboxGcBg;
use bg_process::{delivery, BgProcess};
use bot_core::bot::TgBot;
use bot_main::BotApp;
use chrono::Duration;
use club::Club;
use env::Env;
use eyre::Context;
use log::info;
use model::vote::{DecisionPolicy, Resubmission};
use payment::ProviderRegistry;
use teloxide::types::ChatId;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env = Env::load()?;
    pretty_env_logger::init();
    color_eyre::install()?;

    info!("connecting to mongo");
    let storage = storage::Storage::new(env.mongo_url())
        .await
        .context("Failed to create storage")?;

    let policy = DecisionPolicy {
        quorum: env.quorum(),
        resubmission: match env.resubmission_cooldown_hours() {
            0 => Resubmission::Auto,
            hours => Resubmission::Cooldown { hours },
        },
    };
    let (wake_tx, wake_rx) = mpsc::channel(1);
    let club = Club::new(storage, policy, env.channel_link().to_owned(), wake_tx);

    let app = BotApp::new(env.clone());
    let tg = Arc::new(TgBot::new(app.bot.clone(), ChatId(env.channel_id())));
    let providers = ProviderRegistry::from_env(&env);

    delivery::spawn(club.clone(), tg.clone(), wake_rx);

    let bg = BgProcess::new().await?;
    bg.add(ExpiryBg::new(
        club.clone(),
        tg.clone(),
        Duration::days(env.warning_days() as i64),
    ))
    .await?;
    bg.add(OutboxGcBg::new(club.clone())).await?;
    bg.start().await?;

    info!("Starting bot...");
    app.start(Arc::new(club), tg, providers).await?;
    Ok(())
}
