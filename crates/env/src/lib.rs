use std::{env::var, sync::Arc};

use dotenv::dotenv;
use eyre::{bail, Context, Error};

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

struct EnvInner {
    tg_token: String,
    mongo_url: String,
    channel_id: i64,
    channel_link: String,
    admins: Vec<i64>,
    quorum: u32,
    resubmission_cooldown_hours: u32,
    warning_days: u32,
    payment_provider_token: Option<String>,
    yookassa_shop_id: Option<String>,
    yookassa_token: Option<String>,
    bot_url: Option<String>,
    tariffs: String,
}

const DEFAULT_TARIFFS: &str = "mon.1:500";

impl Env {
    pub fn tg_token(&self) -> &str {
        &self.0.tg_token
    }

    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    /// The paid channel the bot manages access to.
    pub fn channel_id(&self) -> i64 {
        self.0.channel_id
    }

    /// Invite link sent to members after payment.
    pub fn channel_link(&self) -> &str {
        &self.0.channel_link
    }

    pub fn admins(&self) -> &[i64] {
        &self.0.admins
    }

    pub fn is_admin(&self, tg_id: i64) -> bool {
        self.0.admins.contains(&tg_id)
    }

    /// Approvals required for a positive verdict. Defaults to the number
    /// of configured admins.
    pub fn quorum(&self) -> u32 {
        self.0.quorum
    }

    /// Hours a rejected applicant waits before reapplying. Zero means no
    /// waiting.
    pub fn resubmission_cooldown_hours(&self) -> u32 {
        self.0.resubmission_cooldown_hours
    }

    /// How many days before the subscription end the notice goes out.
    pub fn warning_days(&self) -> u32 {
        self.0.warning_days
    }

    pub fn payment_provider_token(&self) -> Option<&str> {
        self.0.payment_provider_token.as_deref()
    }

    pub fn yookassa_shop_id(&self) -> Option<&str> {
        self.0.yookassa_shop_id.as_deref()
    }

    pub fn yookassa_token(&self) -> Option<&str> {
        self.0.yookassa_token.as_deref()
    }

    /// Where external checkouts send the user back to, usually the
    /// t.me link of this bot.
    pub fn bot_url(&self) -> Option<&str> {
        self.0.bot_url.as_deref()
    }

    /// Purchasable periods in `period:price` notation, comma separated,
    /// e.g. `mon.1:500, mon.3:1350`.
    pub fn tariffs(&self) -> &str {
        &self.0.tariffs
    }

    pub fn load() -> Result<Env, Error> {
        dotenv().ok();

        let admins = parse_admins(&var("ADMINS").context("ADMINS is not set")?)?;
        let quorum = match var("QUORUM") {
            Ok(value) => value.parse().context("QUORUM must be a number")?,
            Err(_) => admins.len() as u32,
        };

        Ok(Env(Arc::new(EnvInner {
            tg_token: var("TG_TOKEN").context("TG_TOKEN is not set")?,
            mongo_url: var("MONGO_URL").context("MONGO_URL is not set")?,
            channel_id: var("CHANNEL_ID")
                .context("CHANNEL_ID is not set")?
                .parse()
                .context("CHANNEL_ID must be a number")?,
            channel_link: var("CHANNEL_LINK").context("CHANNEL_LINK is not set")?,
            admins,
            quorum,
            resubmission_cooldown_hours: optional_number("RESUBMISSION_COOLDOWN_HOURS", 0)?,
            warning_days: optional_number("WARNING_DAYS", 1)?,
            payment_provider_token: var("PAYMENT_PROVIDER_TOKEN").ok(),
            yookassa_shop_id: var("YOOKASSA_SHOP_ID").ok(),
            yookassa_token: var("YOOKASSA_TOKEN").ok(),
            bot_url: var("BOT_URL").ok(),
            tariffs: var("TARIFFS").unwrap_or_else(|_| DEFAULT_TARIFFS.to_owned()),
        })))
    }
}

fn optional_number(name: &str, default: u32) -> Result<u32, Error> {
    match var(name) {
        Ok(value) => value.parse().context(format!("{} must be a number", name)),
        Err(_) => Ok(default),
    }
}

fn parse_admins(raw: &str) -> Result<Vec<i64>, Error> {
    let admins = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .context(format!("Bad admin id: {}", part))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if admins.is_empty() {
        bail!("ADMINS must name at least one id");
    }
    Ok(admins)
}

#[cfg(test)]
mod tests {
    use super::parse_admins;

    #[test]
    fn parses_admin_list() {
        let admins = parse_admins("1, 2,3").unwrap();
        assert_eq!(admins, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(parse_admins("").is_err());
        assert!(parse_admins(" , ").is_err());
        assert!(parse_admins("1,x").is_err());
    }
}
