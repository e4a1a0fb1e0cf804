use async_trait::async_trait;
use eyre::Error;
use tokio_cron_scheduler::{Job, JobScheduler};

pub mod delivery;
pub mod notifier;
pub mod process;

/// A periodic background task. `CRON` takes english scheduling syntax,
/// for example "every 1 minute".
#[async_trait]
pub trait Task: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    const CRON: &'static str;

    async fn process(&mut self) -> Result<(), Error>;
}

pub struct BgProcess {
    scheduler: JobScheduler,
}

impl BgProcess {
    pub async fn new() -> Result<Self, Error> {
        Ok(BgProcess {
            scheduler: JobScheduler::new().await?,
        })
    }

    /// Schedules a task. Failures of a single run are logged and do not
    /// stop the schedule.
    pub async fn add<T: Task>(&self, task: T) -> Result<(), Error> {
        let job = Job::new_async(T::CRON, move |_uuid, _lock| {
            let mut task = task.clone();
            Box::pin(async move {
                log::debug!("Running task {}", T::NAME);
                if let Err(err) = task.process().await {
                    log::error!("Task {} failed: {:#}", T::NAME, err);
                }
            })
        })?;
        self.scheduler.add(job).await?;
        Ok(())
    }

    pub async fn start(&self) -> Result<(), Error> {
        self.scheduler.start().await?;
        Ok(())
    }
}
