use std::ops::Deref;

use eyre::Result;
use log::info;
use model::account::{Account, AccountName};
use model::session::Session;
use storage::accounts::AccountStore;
use tx_macro::tx;

#[derive(Clone)]
pub struct Accounts {
    store: AccountStore,
}

impl Accounts {
    pub(crate) fn new(store: AccountStore) -> Self {
        Accounts { store }
    }

    /// Registers the account on first contact. Repeated calls refresh the
    /// profile name and report `false`, so callers can tell a fresh
    /// application from a returning user.
    #[tx]
    pub async fn create(
        &self,
        session: &mut Session,
        tg_id: i64,
        name: AccountName,
    ) -> Result<(Account, bool)> {
        if let Some(account) = self.store.get_by_tg_id(session, tg_id).await? {
            self.store.set_name(session, account.id, &name).await?;
            return Ok((Account { name, ..account }, false));
        }

        let account = Account::new(tg_id, name);
        self.store.insert(session, &account).await?;
        info!("Registered account:{}", tg_id);
        Ok((account, true))
    }

    #[tx]
    pub async fn set_blocked(
        &self,
        session: &mut Session,
        tg_id: i64,
        blocked: bool,
    ) -> Result<bool> {
        let account = match self.store.get_by_tg_id(session, tg_id).await? {
            Some(account) => account,
            None => return Ok(false),
        };
        let changed = self.store.set_blocked(session, account.id, blocked).await?;
        if changed {
            info!("Set blocked:{} for account:{}", blocked, tg_id);
        }
        Ok(changed)
    }
}

impl Deref for Accounts {
    type Target = AccountStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
