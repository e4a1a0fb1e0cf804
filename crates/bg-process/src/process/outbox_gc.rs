use async_trait::async_trait;
use club::Club;
use eyre::Error;
use log::info;

use crate::Task;

/// Drops outbox entries past their retention deadline, delivered or not.
#[derive(Clone)]
pub struct OutboxGcBg {
    club: Club,
}

impl OutboxGcBg {
    pub fn new(club: Club) -> OutboxGcBg {
        OutboxGcBg { club }
    }
}

#[async_trait]
impl Task for OutboxGcBg {
    const NAME: &'static str = "outbox-gc";
    const CRON: &'static str = "every day at 03:00";

    async fn process(&mut self) -> Result<(), Error> {
        let mut session = self.club.db.start_session().await?;
        let removed = self.club.outbox.collect_garbage(&mut session).await?;
        if removed > 0 {
            info!("Removed {} stale outbox entries", removed);
        }
        Ok(())
    }
}
