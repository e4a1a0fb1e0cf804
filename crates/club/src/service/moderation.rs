use chrono::Utc;
use log::info;
use model::account::{ModerationState, ModerationStatus};
use model::notification::NotificationId;
use model::session::Session;
use model::vote::{tally, Decision, DecisionPolicy};
use storage::votes::VoteStore;
use thiserror::Error;
use tx_macro::tx;

use super::accounts::Accounts;
use super::outbox::Outbox;

const APPROVED_MESSAGE: &str = "Ваша заявка одобрена. Добро пожаловать в клуб!";
const REJECTED_MESSAGE: &str = "К сожалению, ваша заявка отклонена.";

#[derive(Clone)]
pub struct Moderation {
    accounts: Accounts,
    votes: VoteStore,
    outbox: Outbox,
    policy: DecisionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote is on record. `decision` is the tally after it.
    Applied { decision: Decision },
    /// The application was already decided, the vote was discarded.
    NoChange,
}

#[derive(Debug, Error)]
pub enum CastVoteError {
    #[error("Applicant not found: {0}")]
    UnknownApplicant(i64),
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for CastVoteError {
    fn from(err: mongodb::error::Error) -> Self {
        CastVoteError::Common(err.into())
    }
}

impl Moderation {
    pub(crate) fn new(
        accounts: Accounts,
        votes: VoteStore,
        outbox: Outbox,
        policy: DecisionPolicy,
    ) -> Self {
        Moderation {
            accounts,
            votes,
            outbox,
            policy,
        }
    }

    /// Records an admin's vote and applies the verdict if the tally became
    /// terminal. One rejection decides immediately, approvals decide once
    /// the quorum is reached. A repeated vote by the same admin replaces
    /// the previous one.
    ///
    /// The vote, the status change, the notification job and the vote
    /// cleanup all land in one transaction, so a verdict is applied and
    /// queued for delivery exactly once no matter how many admins tap the
    /// button concurrently.
    #[tx]
    pub async fn cast_vote(
        &self,
        session: &mut Session,
        applicant: i64,
        admin: i64,
        approved: bool,
    ) -> Result<VoteOutcome, CastVoteError> {
        let account = self
            .accounts
            .get_by_tg_id(session, applicant)
            .await?
            .ok_or(CastVoteError::UnknownApplicant(applicant))?;

        if account.moderation.status.is_terminal() && account.moderation.notified {
            return Ok(VoteOutcome::NoChange);
        }

        let now = Utc::now();
        self.votes
            .upsert(session, account.id, admin, approved, now)
            .await?;
        let votes = self.votes.list(session, account.id).await?;
        let decision = tally(&votes, &self.policy);

        let status = match decision {
            Decision::Pending => return Ok(VoteOutcome::Applied { decision }),
            Decision::Approved => ModerationStatus::Approved,
            Decision::Rejected => ModerationStatus::Rejected,
        };

        // A terminal status with the notified flag down means an earlier
        // verdict never reached the outbox. Keep its timestamp, so the
        // re-queued notification carries the same business key and the
        // dedup index swallows it.
        let decided_at = account.moderation.decided_at.unwrap_or(now);
        let mut moderation = account.moderation.clone();
        moderation.status = status;
        moderation.decided_at = Some(decided_at);
        moderation.notified = true;
        self.accounts
            .update_moderation(session, account.id, &moderation)
            .await?;

        let (notification, message) = match status {
            ModerationStatus::Approved => (
                NotificationId::ModerationApproved {
                    account: account.id,
                    decided_at,
                },
                APPROVED_MESSAGE,
            ),
            _ => (
                NotificationId::ModerationRejected {
                    account: account.id,
                    decided_at,
                },
                REJECTED_MESSAGE,
            ),
        };
        self.outbox
            .enqueue(session, account.id, message.to_owned(), notification)
            .await?;
        self.votes.clear(session, account.id).await?;

        info!("Decided moderation:{} for applicant:{}", status, applicant);
        Ok(VoteOutcome::Applied { decision })
    }

    /// Reopens a rejected application if the resubmission policy permits
    /// it. Returns false when the account is not rejected or the cooldown
    /// has not elapsed yet.
    #[tx]
    pub async fn resubmit(&self, session: &mut Session, tg_id: i64) -> Result<bool, CastVoteError> {
        let account = self
            .accounts
            .get_by_tg_id(session, tg_id)
            .await?
            .ok_or(CastVoteError::UnknownApplicant(tg_id))?;

        if account.moderation.status != ModerationStatus::Rejected {
            return Ok(false);
        }
        if !self
            .policy
            .resubmission
            .allows(account.moderation.decided_at, Utc::now())
        {
            return Ok(false);
        }

        self.accounts
            .update_moderation(session, account.id, &ModerationState::default())
            .await?;
        self.votes.clear(session, account.id).await?;
        info!("Reopened moderation for applicant:{}", tg_id);
        Ok(true)
    }
}
