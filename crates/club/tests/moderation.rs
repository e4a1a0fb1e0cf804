//! Runs against a live MongoDB replica set (the `#[tx]` transactions
//! need one). Point MONGO_URL at it and run with `cargo test -- --ignored`.

use std::time::{SystemTime, UNIX_EPOCH};

use bson::oid::ObjectId;
use club::service::moderation::VoteOutcome;
use club::Club;
use model::account::{AccountName, ModerationStatus};
use model::session::Session;
use model::vote::{Decision, DecisionPolicy, Resubmission};
use storage::Storage;
use tokio::sync::mpsc;

async fn setup() -> (Club, Storage) {
    let uri =
        std::env::var("MONGO_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_owned());
    let storage = Storage::new(&uri).await.expect("mongo is not reachable");
    let (wake, _rx) = mpsc::channel(1);
    let club = Club::new(
        storage.clone(),
        DecisionPolicy {
            quorum: 1,
            resubmission: Resubmission::Auto,
        },
        "https://t.me/club".to_owned(),
        wake,
    );
    (club, storage)
}

fn fresh_tg_id() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as i64
}

fn name(first: &str) -> AccountName {
    AccountName {
        tg_user_name: None,
        first_name: first.to_owned(),
        last_name: None,
    }
}

async fn queued_for(storage: &Storage, session: &mut Session, to: ObjectId) -> usize {
    storage
        .outbox
        .to_send(session)
        .await
        .unwrap()
        .into_iter()
        .filter(|job| job.to == to)
        .count()
}

#[tokio::test]
#[ignore = "needs a MongoDB replica set from MONGO_URL"]
async fn repeated_vote_changes_nothing() {
    let (club, storage) = setup().await;
    let tg_id = fresh_tg_id();
    let admin = 100;

    let mut session = club.db.start_session().await.unwrap();
    let (account, created) = club
        .accounts
        .create(&mut session, tg_id, name("Мария"))
        .await
        .unwrap();
    assert!(created);

    let outcome = club
        .moderation
        .cast_vote(&mut session, tg_id, admin, true)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Applied {
            decision: Decision::Approved
        }
    );

    // the verdict landed, the vote set is gone, one notification queued
    let votes = storage.votes.list(&mut session, account.id).await.unwrap();
    assert!(votes.is_empty());
    assert_eq!(queued_for(&storage, &mut session, account.id).await, 1);

    let stored = storage
        .accounts
        .get(&mut session, account.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.moderation.status, ModerationStatus::Approved);
    assert!(stored.moderation.notified);
    assert_eq!(stored.version, 1);

    // the same admin taps the same button again
    let again = club
        .moderation
        .cast_vote(&mut session, tg_id, admin, true)
        .await
        .unwrap();
    assert_eq!(again, VoteOutcome::NoChange);

    let stored = storage
        .accounts
        .get(&mut session, account.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version, 1, "no second status write");
    assert_eq!(queued_for(&storage, &mut session, account.id).await, 1);
    assert!(storage
        .votes
        .list(&mut session, account.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore = "needs a MongoDB replica set from MONGO_URL"]
async fn unsent_verdict_requeues_with_stable_key() {
    let (club, storage) = setup().await;
    let tg_id = fresh_tg_id();

    let mut session = club.db.start_session().await.unwrap();
    let (account, _) = club
        .accounts
        .create(&mut session, tg_id, name("Олег"))
        .await
        .unwrap();
    club.moderation
        .cast_vote(&mut session, tg_id, 100, true)
        .await
        .unwrap();
    assert_eq!(queued_for(&storage, &mut session, account.id).await, 1);

    // knock the notified flag down, as a manual edit or import would
    let stored = storage
        .accounts
        .get(&mut session, account.id)
        .await
        .unwrap()
        .unwrap();
    let mut moderation = stored.moderation.clone();
    moderation.notified = false;
    storage
        .accounts
        .update_moderation(&mut session, account.id, &moderation)
        .await
        .unwrap();

    // the next vote re-applies the verdict, the notification keeps the
    // original decision timestamp and dedups against the queued job
    let outcome = club
        .moderation
        .cast_vote(&mut session, tg_id, 101, true)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Applied {
            decision: Decision::Approved
        }
    );

    let repaired = storage
        .accounts
        .get(&mut session, account.id)
        .await
        .unwrap()
        .unwrap();
    assert!(repaired.moderation.notified);
    assert_eq!(repaired.moderation.decided_at, stored.moderation.decided_at);
    assert_eq!(queued_for(&storage, &mut session, account.id).await, 1);
}
