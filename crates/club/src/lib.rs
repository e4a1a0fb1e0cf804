pub mod service;

use model::vote::DecisionPolicy;
use service::accounts::Accounts;
use service::billing::Billing;
use service::moderation::Moderation;
use service::outbox::Outbox;
use storage::session::Db;
use storage::Storage;
use tokio::sync::mpsc;

/// Club business layer. Every mutating operation opens a transaction
/// through `#[tx]`, so callers only obtain a [`model::session::Session`]
/// from `db` and pass it down.
#[derive(Clone)]
pub struct Club {
    pub db: Db,
    pub accounts: Accounts,
    pub moderation: Moderation,
    pub billing: Billing,
    pub outbox: Outbox,
}

impl Club {
    pub fn new(
        storage: Storage,
        policy: DecisionPolicy,
        channel_link: String,
        wake: mpsc::Sender<()>,
    ) -> Self {
        let outbox = Outbox::new(storage.outbox, wake);
        let accounts = Accounts::new(storage.accounts);
        let moderation = Moderation::new(accounts.clone(), storage.votes, outbox.clone(), policy);
        let billing = Billing::new(
            accounts.clone(),
            storage.payments,
            outbox.clone(),
            channel_link,
        );
        Club {
            db: storage.db,
            accounts,
            moderation,
            billing,
            outbox,
        }
    }
}
