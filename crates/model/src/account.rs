use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A community member or applicant. One document per Telegram user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub tg_id: i64,
    pub name: AccountName,
    #[serde(default)]
    pub moderation: ModerationState,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub subscription: SubscriptionStatus,
    #[serde(default)]
    pub version: u64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(tg_id: i64, name: AccountName) -> Account {
        Account {
            id: ObjectId::new(),
            tg_id,
            name,
            moderation: ModerationState::default(),
            blocked: false,
            subscription: SubscriptionStatus::default(),
            version: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccountName {
    pub tg_user_name: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ModerationState {
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
    /// Set together with a terminal status. While true, further votes
    /// for this applicant are no-ops.
    #[serde(default)]
    pub notified: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ModerationStatus::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub active: bool,
    /// Meaningful only while `active`.
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[serde(default = "epoch")]
    pub expires_at: DateTime<Utc>,
    /// True once the last-day notice for the current period went out.
    /// Reset on every grant so a new period warns again.
    #[serde(default)]
    pub warning_sent: bool,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        SubscriptionStatus {
            active: false,
            expires_at: epoch(),
            warning_sent: false,
        }
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_is_pending_and_inactive() {
        let account = Account::new(
            42,
            AccountName {
                tg_user_name: Some("durov".to_owned()),
                first_name: "Павел".to_owned(),
                last_name: None,
            },
        );
        assert_eq!(account.moderation.status, ModerationStatus::Pending);
        assert!(!account.moderation.notified);
        assert!(!account.blocked);
        assert!(!account.subscription.active);
        assert!(!account.subscription.warning_sent);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!ModerationStatus::Pending.is_terminal());
        assert!(ModerationStatus::Approved.is_terminal());
        assert!(ModerationStatus::Rejected.is_terminal());
    }
}
