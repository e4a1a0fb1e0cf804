mod handlers;
mod tariffs;

use std::sync::Arc;

use bot_core::bot::TgBot;
use club::Club;
use env::Env;
use eyre::Result;
use handlers::{callback::callback_handler, message::message_handler};
use payment::ProviderRegistry;
use teloxide::{
    dispatching::UpdateFilterExt as _,
    dptree,
    prelude::{Dispatcher, Requester as _, ResponseResult},
    types::{BotCommand, CallbackQuery, Message, PreCheckoutQuery, Update},
    Bot,
};

#[derive(Clone)]
pub struct BotApp {
    pub bot: Bot,
    pub env: Env,
}

impl BotApp {
    pub fn new(env: Env) -> Self {
        BotApp {
            bot: Bot::new(env.tg_token()),
            env,
        }
    }

    pub async fn start(
        self,
        club: Arc<Club>,
        tg: Arc<TgBot>,
        providers: ProviderRegistry,
    ) -> Result<()> {
        let bot = self.bot;
        bot.set_my_commands(vec![BotCommand::new("start", "Меню")])
            .await?;

        let msg_env = self.env.clone();
        let msg_club = club.clone();
        let msg_tg = tg.clone();
        let msg_providers = providers.clone();

        let cb_env = self.env.clone();
        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                message_handler(
                    msg,
                    msg_env.clone(),
                    msg_club.clone(),
                    msg_tg.clone(),
                    msg_providers.clone(),
                )
            }))
            .branch(
                Update::filter_pre_checkout_query()
                    .endpoint(|bot: Bot, q: PreCheckoutQuery| pre_checkout_query_handler(bot, q)),
            )
            .branch(
                Update::filter_callback_query().endpoint(move |q: CallbackQuery| {
                    callback_handler(
                        q,
                        cb_env.clone(),
                        club.clone(),
                        tg.clone(),
                        providers.clone(),
                    )
                }),
            );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
        Ok(())
    }
}

async fn pre_checkout_query_handler(bot: Bot, q: PreCheckoutQuery) -> ResponseResult<()> {
    bot.answer_pre_checkout_query(q.id, true).await?;
    Ok(())
}
