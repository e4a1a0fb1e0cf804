use bson::doc;
use eyre::Result;
use log::info;
use model::payment::PaymentRecord;
use model::session::Session;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "payments";

#[derive(Clone)]
pub struct PaymentStore {
    payments: Collection<PaymentRecord>,
}

impl PaymentStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let payments = db.collection(COLLECTION);
        payments
            .create_index(IndexModel::builder().keys(doc! { "account": 1 }).build())
            .await?;
        payments
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "external_id": 1 })
                    .options(IndexOptions::builder().unique(true).sparse(true).build())
                    .build(),
            )
            .await?;
        Ok(PaymentStore { payments })
    }

    pub async fn exists(&self, session: &mut Session, external_id: &str) -> Result<bool> {
        let filter = doc! { "external_id": external_id };
        let count = self
            .payments
            .count_documents(filter)
            .session(&mut *session)
            .await?;
        Ok(count > 0)
    }

    pub async fn add(&self, session: &mut Session, record: &PaymentRecord) -> Result<()> {
        info!("Recording payment: {:?}", record);
        self.payments
            .insert_one(record)
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
