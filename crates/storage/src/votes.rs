use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use eyre::Result;
use futures_util::stream::TryStreamExt as _;
use log::info;
use model::session::Session;
use model::vote::Vote;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "moderation_votes";

#[derive(Clone)]
pub struct VoteStore {
    votes: Collection<Vote>,
}

impl VoteStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let votes = db.collection(COLLECTION);
        votes
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "applicant": 1, "admin": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
        Ok(VoteStore { votes })
    }

    /// One document per (applicant, admin), the latest vote wins.
    pub async fn upsert(
        &self,
        session: &mut Session,
        applicant: ObjectId,
        admin: i64,
        approved: bool,
        cast_at: DateTime<Utc>,
    ) -> Result<()> {
        info!(
            "Vote by {} for applicant {}: approved={}",
            admin, applicant, approved
        );
        self.votes
            .update_one(
                doc! { "applicant": applicant, "admin": admin },
                doc! {
                    "$set": { "approved": approved, "cast_at": cast_at },
                    "$setOnInsert": { "_id": ObjectId::new() },
                },
            )
            .session(&mut *session)
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn list(&self, session: &mut Session, applicant: ObjectId) -> Result<Vec<Vote>> {
        let mut cursor = self
            .votes
            .find(doc! { "applicant": applicant })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn clear(&self, session: &mut Session, applicant: ObjectId) -> Result<u64> {
        let result = self
            .votes
            .delete_many(doc! { "applicant": applicant })
            .session(&mut *session)
            .await?;
        Ok(result.deleted_count)
    }
}
