use std::collections::hash_map::Entry;
use std::collections::HashMap;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One admin's current vote on one applicant. The store keeps at most
/// one document per (applicant, admin) pair.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub applicant: ObjectId,
    pub admin: i64,
    pub approved: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(applicant: ObjectId, admin: i64, approved: bool, cast_at: DateTime<Utc>) -> Vote {
        Vote {
            id: ObjectId::new(),
            applicant,
            admin,
            approved,
            cast_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    /// Approvals required for a positive decision. A single rejection
    /// always wins regardless of this value.
    pub quorum: u32,
    pub resubmission: Resubmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resubmission {
    /// A rejected applicant may reapply at any time.
    Auto,
    /// A rejected applicant may reapply only after the cooldown since
    /// the decision has passed.
    Cooldown { hours: u32 },
}

impl Resubmission {
    pub fn allows(&self, decided_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self {
            Resubmission::Auto => true,
            Resubmission::Cooldown { hours } => match decided_at {
                Some(at) => now - at >= chrono::Duration::hours(*hours as i64),
                None => true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Decision::Pending)
    }
}

/// Folds a vote snapshot into a decision.
///
/// Only the latest vote per admin counts. Any effective rejection
/// decides immediately; otherwise the approvals must reach the quorum.
/// The result depends only on the multiset of votes, not their order.
pub fn tally(votes: &[Vote], policy: &DecisionPolicy) -> Decision {
    let mut effective: HashMap<i64, &Vote> = HashMap::new();
    for vote in votes {
        match effective.entry(vote.admin) {
            Entry::Occupied(mut entry) => {
                if vote.cast_at >= entry.get().cast_at {
                    entry.insert(vote);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(vote);
            }
        }
    }

    if effective.values().any(|vote| !vote.approved) {
        return Decision::Rejected;
    }
    if effective.len() as u32 >= policy.quorum.max(1) {
        return Decision::Approved;
    }
    Decision::Pending
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn policy(quorum: u32) -> DecisionPolicy {
        DecisionPolicy {
            quorum,
            resubmission: Resubmission::Auto,
        }
    }

    fn vote(admin: i64, approved: bool, minute: u32) -> Vote {
        Vote::new(
            ObjectId::from_bytes([7; 12]),
            admin,
            approved,
            Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).single().unwrap(),
        )
    }

    #[test]
    fn no_votes_is_pending() {
        assert_eq!(tally(&[], &policy(2)), Decision::Pending);
    }

    #[test]
    fn quorum_boundary() {
        let votes = vec![vote(1, true, 0)];
        assert_eq!(tally(&votes, &policy(2)), Decision::Pending);

        let votes = vec![vote(1, true, 0), vote(2, true, 1)];
        assert_eq!(tally(&votes, &policy(2)), Decision::Approved);
    }

    #[test]
    fn single_rejection_wins() {
        let votes = vec![vote(1, true, 0), vote(2, true, 1), vote(3, false, 2)];
        assert_eq!(tally(&votes, &policy(2)), Decision::Rejected);
    }

    #[test]
    fn rejection_wins_in_any_order() {
        let a = vote(1, true, 0);
        let b = vote(2, false, 1);
        let c = vote(3, true, 2);
        let orders: [[&Vote; 3]; 3] = [[&a, &b, &c], [&c, &a, &b], [&b, &c, &a]];
        for order in orders {
            let votes: Vec<Vote> = order.into_iter().cloned().collect();
            assert_eq!(tally(&votes, &policy(3)), Decision::Rejected);
        }
    }

    #[test]
    fn revote_replaces_previous_vote() {
        // approve then reject: the later vote decides
        let votes = vec![vote(1, true, 0), vote(1, false, 5)];
        assert_eq!(tally(&votes, &policy(1)), Decision::Rejected);

        // reject then approve: the rejection is withdrawn
        let votes = vec![vote(1, false, 0), vote(1, true, 5), vote(2, true, 6)];
        assert_eq!(tally(&votes, &policy(2)), Decision::Approved);
    }

    #[test]
    fn duplicate_admin_counts_once() {
        let votes = vec![vote(1, true, 0), vote(1, true, 1), vote(1, true, 2)];
        assert_eq!(tally(&votes, &policy(2)), Decision::Pending);
    }

    #[test]
    fn tally_ignores_slice_order() {
        let mut votes = vec![vote(1, true, 3), vote(2, false, 1), vote(3, true, 2)];
        let forward = tally(&votes, &policy(3));
        votes.reverse();
        assert_eq!(forward, tally(&votes, &policy(3)));
    }

    #[test]
    fn degenerate_quorum_still_requires_a_vote() {
        assert_eq!(tally(&[], &policy(0)), Decision::Pending);
        assert_eq!(tally(&[vote(1, true, 0)], &policy(0)), Decision::Approved);
    }

    #[test]
    fn cooldown_gating() {
        let decided = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().unwrap();
        let policy = Resubmission::Cooldown { hours: 24 };

        assert!(!policy.allows(Some(decided), decided + chrono::Duration::hours(23)));
        assert!(policy.allows(Some(decided), decided + chrono::Duration::hours(24)));
        assert!(Resubmission::Auto.allows(Some(decided), decided));
        assert!(policy.allows(None, decided));
    }
}
