use async_trait::async_trait;
use eyre::{eyre, Context as _, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Order, PaymentIntent, PaymentProvider, PaymentState, ProviderKind};

const BASE_URL: &str = "https://api.yookassa.ru/v3/payments";

/// Redirect checkout: we create a payment, send the user to the
/// confirmation url and poll for the result.
/// <https://yookassa.ru/developers/payment-acceptance/getting-started/quick-start>
pub struct YooKassa {
    client: reqwest::Client,
    shop_id: String,
    api_key: String,
    return_url: String,
}

impl YooKassa {
    pub fn new(shop_id: String, api_key: String, return_url: String) -> Self {
        YooKassa {
            client: reqwest::Client::new(),
            shop_id,
            api_key,
            return_url,
        }
    }
}

#[async_trait]
impl PaymentProvider for YooKassa {
    fn kind(&self) -> ProviderKind {
        ProviderKind::YooKassa
    }

    async fn initiate(&self, order: &Order) -> Result<PaymentIntent> {
        let request = PaymentRequest {
            amount: Amount {
                value: order.amount.to_string(),
                currency: "RUB".to_owned(),
            },
            capture: true,
            confirmation: Confirmation {
                confirmation_type: "redirect".to_owned(),
                return_url: self.return_url.clone(),
            },
            description: order.description.clone(),
        };

        let payment = self
            .client
            .post(BASE_URL)
            .basic_auth(&self.shop_id, Some(&self.api_key))
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&request)
            .send()
            .await
            .context("Failed to create payment")?
            .error_for_status()?
            .json::<Payment>()
            .await
            .context("Failed to parse payment response")?;

        let redirect_url = payment
            .confirmation
            .and_then(|confirmation| confirmation.confirmation_url)
            .ok_or_else(|| eyre!("Payment {} has no confirmation url", payment.id))?;
        Ok(PaymentIntent {
            external_id: payment.id,
            redirect_url: Some(redirect_url),
        })
    }

    async fn check(&self, external_id: &str) -> Result<PaymentState> {
        let payment = self
            .client
            .get(format!("{}/{}", BASE_URL, external_id))
            .basic_auth(&self.shop_id, Some(&self.api_key))
            .send()
            .await
            .context("Failed to check payment")?
            .error_for_status()?
            .json::<Payment>()
            .await
            .context("Failed to parse payment response")?;

        Ok(match payment.status {
            Status::Succeeded => PaymentState::Succeeded,
            Status::Canceled => PaymentState::Canceled,
            Status::Pending | Status::WaitingForCapture => PaymentState::Pending,
        })
    }
}

#[derive(Serialize, Debug)]
struct PaymentRequest {
    amount: Amount,
    capture: bool,
    confirmation: Confirmation,
    description: String,
}

#[derive(Serialize, Debug)]
struct Amount {
    value: String,
    currency: String,
}

#[derive(Serialize, Debug)]
struct Confirmation {
    #[serde(rename = "type")]
    confirmation_type: String,
    return_url: String,
}

#[derive(Deserialize, Debug)]
struct Payment {
    id: String,
    status: Status,
    confirmation: Option<ConfirmationUrl>,
}

#[derive(Deserialize, Debug)]
struct ConfirmationUrl {
    confirmation_url: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
enum Status {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
}
