use bson::{doc, oid::ObjectId, to_document};
use eyre::Result;
use futures_util::stream::TryStreamExt as _;
use model::notification::OutboxJob;
use model::session::Session;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "outbox";

#[derive(Clone)]
pub struct OutboxStore {
    jobs: Collection<OutboxJob>,
}

impl OutboxStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let jobs = db.collection(COLLECTION);
        jobs.create_index(IndexModel::builder().keys(doc! { "sent": 1 }).build())
            .await?;
        jobs.create_index(IndexModel::builder().keys(doc! { "deadline": 1 }).build())
            .await?;
        jobs.create_index(
            IndexModel::builder()
                .keys(doc! { "dedup_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;
        Ok(OutboxStore { jobs })
    }

    /// Returns false when a job with the same business identity is
    /// already stored.
    pub async fn insert(&self, session: &mut Session, job: &OutboxJob) -> Result<bool> {
        let result = self
            .jobs
            .update_one(
                doc! { "dedup_id": job.dedup_id },
                doc! { "$setOnInsert": to_document(job)? },
            )
            .session(&mut *session)
            .upsert(true)
            .await?;
        Ok(result.upserted_id.is_some())
    }

    pub async fn to_send(&self, session: &mut Session) -> Result<Vec<OutboxJob>> {
        let filter = doc! { "sent": false, "failed": false };
        let mut cursor = self.jobs.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn mark_sent(&self, session: &mut Session, id: ObjectId, attempts: u32) -> Result<()> {
        self.jobs
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "sent": true, "attempts": attempts } },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        session: &mut Session,
        id: ObjectId,
        attempts: u32,
    ) -> Result<()> {
        self.jobs
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "failed": true, "attempts": attempts } },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn collect_garbage(&self, session: &mut Session) -> Result<u64> {
        let filter = doc! {
            "deadline": {
                "$lt": chrono::Utc::now()
            }
        };
        let result = self.jobs.delete_many(filter).session(&mut *session).await?;
        Ok(result.deleted_count)
    }
}
