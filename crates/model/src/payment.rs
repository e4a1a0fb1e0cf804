use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::period::Period;

/// A confirmed payment. `external_id` carries the provider's payment
/// id when there is one and dedups repeated confirmations.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub account: ObjectId,
    pub provider: String,
    pub amount: Decimal,
    pub period: Period,
    /// Absent rather than null when unknown, the unique index on this
    /// field is sparse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub paid_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        account: ObjectId,
        provider: String,
        amount: Decimal,
        period: Period,
        external_id: Option<String>,
    ) -> PaymentRecord {
        PaymentRecord {
            id: ObjectId::new(),
            account,
            provider,
            amount,
            period,
            external_id,
            paid_at: Utc::now(),
        }
    }
}
