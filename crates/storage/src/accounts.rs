use bson::{doc, oid::ObjectId, to_document};
use chrono::{DateTime, Utc};
use eyre::{Error, Result};
use futures_util::stream::TryStreamExt as _;
use log::info;
use model::account::{Account, AccountName, ModerationState, SubscriptionStatus};
use model::session::Session;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "accounts";

#[derive(Clone)]
pub struct AccountStore {
    accounts: Collection<Account>,
}

impl AccountStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let accounts = db.collection(COLLECTION);
        accounts
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "tg_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
        accounts
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "subscription.active": 1 })
                    .build(),
            )
            .await?;
        Ok(AccountStore { accounts })
    }

    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_by_tg_id(&self, session: &mut Session, tg_id: i64) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .find_one(doc! { "tg_id": tg_id })
            .session(&mut *session)
            .await?)
    }

    pub async fn insert(&self, session: &mut Session, account: &Account) -> Result<()> {
        info!("Inserting account: {:?}", account);
        let result = self
            .accounts
            .update_one(
                doc! { "tg_id": account.tg_id },
                doc! { "$setOnInsert": to_document(account)? },
            )
            .session(&mut *session)
            .upsert(true)
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Account already exists"));
        }
        Ok(())
    }

    pub async fn set_name(
        &self,
        session: &mut Session,
        id: ObjectId,
        name: &AccountName,
    ) -> Result<()> {
        let result = self
            .accounts
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "name": to_document(name)? }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::msg("Account not found"));
        }
        Ok(())
    }

    pub async fn update_moderation(
        &self,
        session: &mut Session,
        id: ObjectId,
        moderation: &ModerationState,
    ) -> Result<()> {
        info!("Updating moderation state for {}: {:?}", id, moderation);
        let result = self
            .accounts
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "moderation": to_document(moderation)? }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::msg("Account not found"));
        }
        Ok(())
    }

    pub async fn set_blocked(
        &self,
        session: &mut Session,
        id: ObjectId,
        blocked: bool,
    ) -> Result<bool> {
        info!("Blocking account {}: {}", id, blocked);
        let result = self
            .accounts
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "blocked": blocked }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn grant_subscription(
        &self,
        session: &mut Session,
        id: ObjectId,
        until: DateTime<Utc>,
    ) -> Result<()> {
        info!("Granting subscription for {} until {}", id, until);
        let subscription = SubscriptionStatus {
            active: true,
            expires_at: until,
            warning_sent: false,
        };
        let result = self
            .accounts
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "subscription": to_document(&subscription)? }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::msg("Account not found"));
        }
        Ok(())
    }

    pub async fn set_warning_sent(&self, session: &mut Session, id: ObjectId) -> Result<bool> {
        let result = self
            .accounts
            .update_one(
                doc! { "_id": id, "subscription.warning_sent": false },
                doc! { "$set": { "subscription.warning_sent": true }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Deactivates the subscription. Returns false when it was already
    /// inactive, which makes concurrent sweeps converge on one expiry.
    pub async fn expire_subscription(&self, session: &mut Session, id: ObjectId) -> Result<bool> {
        info!("Expiring subscription for account {}", id);
        let result = self
            .accounts
            .update_one(
                doc! { "_id": id, "subscription.active": true },
                doc! {
                    "$set": { "subscription.active": false, "subscription.warning_sent": false },
                    "$inc": { "version": 1 }
                },
            )
            .session(&mut *session)
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn find_active_subscriptions(&self, session: &mut Session) -> Result<Vec<Account>> {
        let filter = doc! { "subscription.active": true };
        let mut cursor = self.accounts.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }
}
