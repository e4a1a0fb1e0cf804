pub mod accounts;
pub mod outbox;
pub mod payments;
pub mod session;
pub mod votes;

use accounts::AccountStore;
use eyre::Result;
use outbox::OutboxStore;
use payments::PaymentStore;
use session::Db;
use votes::VoteStore;

const DB_NAME: &str = "club_db";

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub accounts: AccountStore,
    pub votes: VoteStore,
    pub outbox: OutboxStore,
    pub payments: PaymentStore,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let db = Db::new(uri, DB_NAME).await?;
        let accounts = AccountStore::new(&db).await?;
        let votes = VoteStore::new(&db).await?;
        let outbox = OutboxStore::new(&db).await?;
        let payments = PaymentStore::new(&db).await?;

        Ok(Storage {
            db,
            accounts,
            votes,
            outbox,
            payments,
        })
    }
}
