pub mod tg_invoice;
pub mod yookassa;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use env::Env;
use eyre::Result;
use log::info;
use model::decimal::Decimal;
use model::period::Period;
use serde::{Deserialize, Serialize};
use tg_invoice::TgInvoice;
use yookassa::YooKassa;

/// Payment rails the bot can sell subscriptions through.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum ProviderKind {
    /// Telegram's built-in invoices.
    #[strum(serialize = "tg")]
    Tg,
    /// YooKassa redirect checkout.
    #[strum(serialize = "yookassa")]
    YooKassa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Succeeded,
    Canceled,
}

/// A started checkout. `redirect_url` is present for providers that
/// send the user to an external page.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub external_id: String,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub tg_id: i64,
    pub amount: Decimal,
    pub period: Period,
    pub description: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn initiate(&self, order: &Order) -> Result<PaymentIntent>;
    async fn check(&self, external_id: &str) -> Result<PaymentState>;
}

/// The providers the deployment is configured for. A provider missing
/// its credentials is simply absent, the tariff keyboard only offers
/// what is here.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn from_env(env: &Env) -> ProviderRegistry {
        let mut registry = ProviderRegistry::default();
        if env.payment_provider_token().is_some() {
            registry.register(Arc::new(TgInvoice));
        }
        if let (Some(shop_id), Some(token), Some(bot_url)) = (
            env.yookassa_shop_id(),
            env.yookassa_token(),
            env.bot_url(),
        ) {
            registry.register(Arc::new(YooKassa::new(
                shop_id.to_owned(),
                token.to_owned(),
                bot_url.to_owned(),
            )));
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        info!("Payment provider enabled: {}", provider.kind());
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Polls the provider until the payment settles or the budget runs out.
/// Used for redirect providers that have no push channel back to the
/// bot. A payment still pending after the budget is reported as such and
/// left for support to sort out.
pub async fn await_completion(
    provider: Arc<dyn PaymentProvider>,
    external_id: &str,
    step: Duration,
    budget: u32,
) -> Result<PaymentState> {
    for _ in 0..budget {
        tokio::time::sleep(step).await;
        match provider.check(external_id).await? {
            PaymentState::Pending => continue,
            state => return Ok(state),
        }
    }
    Ok(PaymentState::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider(ProviderKind);

    #[async_trait]
    impl PaymentProvider for StaticProvider {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn initiate(&self, _order: &Order) -> Result<PaymentIntent> {
            Ok(PaymentIntent {
                external_id: "ext-1".to_owned(),
                redirect_url: None,
            })
        }

        async fn check(&self, _external_id: &str) -> Result<PaymentState> {
            Ok(PaymentState::Succeeded)
        }
    }

    #[test]
    fn registry_resolves_by_kind() {
        let mut registry = ProviderRegistry::default();
        assert!(registry.is_empty());

        registry.register(Arc::new(StaticProvider(ProviderKind::Tg)));
        assert!(registry.get(ProviderKind::Tg).is_some());
        assert!(registry.get(ProviderKind::YooKassa).is_none());
        assert_eq!(registry.kinds().collect::<Vec<_>>(), vec![ProviderKind::Tg]);
    }

    #[test]
    fn provider_kind_notation() {
        assert_eq!(ProviderKind::Tg.to_string(), "tg");
        assert_eq!(
            "yookassa".parse::<ProviderKind>().ok(),
            Some(ProviderKind::YooKassa)
        );
        assert!("stripe".parse::<ProviderKind>().is_err());
    }
}
