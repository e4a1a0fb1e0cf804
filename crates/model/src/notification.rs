use std::hash::{DefaultHasher, Hash as _, Hasher as _};

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long an undelivered job stays around before garbage collection.
const JOB_TTL_DAYS: i64 = 7;

/// A durable delivery job. Inserted in the same transaction as the
/// state change it announces; a unique index on `dedup_id` makes the
/// insert idempotent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutboxJob {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub to: ObjectId,
    pub notification: NotificationId,
    pub message: String,
    #[serde(default)]
    pub sent: bool,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub attempts: u32,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub deadline: DateTime<Utc>,
    pub dedup_id: ObjectId,
}

impl OutboxJob {
    pub fn new(to: ObjectId, message: String, notification: NotificationId) -> OutboxJob {
        let now = Utc::now();
        OutboxJob {
            id: ObjectId::new(),
            to,
            dedup_id: notification.encode(),
            notification,
            message,
            sent: false,
            failed: false,
            attempts: 0,
            created_at: now,
            deadline: now + chrono::Duration::days(JOB_TTL_DAYS),
        }
    }
}

/// Business identity of a notification. Two jobs announcing the same
/// event encode to the same id and only one of them is ever stored.
#[derive(Debug, Serialize, Deserialize, Clone, Hash)]
pub enum NotificationId {
    ModerationApproved {
        account: ObjectId,
        decided_at: DateTime<Utc>,
    },
    ModerationRejected {
        account: ObjectId,
        decided_at: DateTime<Utc>,
    },
    ExpiryWarning {
        account: ObjectId,
        expires_at: DateTime<Utc>,
    },
    SubscriptionEnded {
        account: ObjectId,
        expires_at: DateTime<Utc>,
    },
    SubscriptionGranted {
        account: ObjectId,
        until: DateTime<Utc>,
    },
}

impl NotificationId {
    pub fn encode(&self) -> ObjectId {
        let mut bytes = [0; 12];
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        let first_part = hasher.finish();
        bytes[..8].copy_from_slice(&first_part.to_be_bytes());

        let mut hasher = DefaultHasher::new();
        "sec".hash(&mut hasher);
        self.hash(&mut hasher);
        let second_part = hasher.finish();
        bytes[8..].copy_from_slice(&second_part.to_be_bytes()[..4]);

        ObjectId::from_bytes(bytes)
    }

    /// A permanently undeliverable rejection notice marks the account
    /// as blocked, everything else is just dropped.
    pub fn blocks_on_failure(&self) -> bool {
        matches!(self, NotificationId::ModerationRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn decided_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn encode_is_deterministic() {
        let id = NotificationId::ModerationApproved {
            account: ObjectId::from_bytes([1; 12]),
            decided_at: decided_at(),
        };
        assert_eq!(id.encode(), id.encode());
    }

    #[test]
    fn distinct_events_encode_to_distinct_ids() {
        let account = ObjectId::from_bytes([1; 12]);
        let approved = NotificationId::ModerationApproved {
            account,
            decided_at: decided_at(),
        };
        let rejected = NotificationId::ModerationRejected {
            account,
            decided_at: decided_at(),
        };
        let other_account = NotificationId::ModerationApproved {
            account: ObjectId::from_bytes([2; 12]),
            decided_at: decided_at(),
        };
        assert_ne!(approved.encode(), rejected.encode());
        assert_ne!(approved.encode(), other_account.encode());
    }

    #[test]
    fn only_rejections_block_on_failure() {
        let account = ObjectId::from_bytes([1; 12]);
        assert!(NotificationId::ModerationRejected {
            account,
            decided_at: decided_at(),
        }
        .blocks_on_failure());
        assert!(!NotificationId::ExpiryWarning {
            account,
            expires_at: decided_at(),
        }
        .blocks_on_failure());
    }
}
