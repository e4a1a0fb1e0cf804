use chrono::{DateTime, Duration, Utc};

use crate::account::SubscriptionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Skip,
    /// Send the one-time end-of-period notice and mark it sent.
    Warn,
    /// Revoke channel access and deactivate the subscription.
    Expire,
}

/// Decides what a sweep pass should do with one subscription.
///
/// The warning branch is checked first and is exclusive: an account
/// never warns and expires in the same pass, the expiry happens on a
/// later sweep. Inactive subscriptions are never touched.
pub fn plan(
    subscription: &SubscriptionStatus,
    now: DateTime<Utc>,
    warn_before: Duration,
) -> SweepAction {
    if !subscription.active {
        return SweepAction::Skip;
    }
    if !subscription.warning_sent && subscription.expires_at - now <= warn_before {
        return SweepAction::Warn;
    }
    if subscription.expires_at <= now {
        return SweepAction::Expire;
    }
    SweepAction::Skip
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().unwrap()
    }

    fn subscription(active: bool, remaining_hours: i64, warning_sent: bool) -> SubscriptionStatus {
        SubscriptionStatus {
            active,
            expires_at: now() + Duration::hours(remaining_hours),
            warning_sent,
        }
    }

    #[test]
    fn inactive_is_skipped() {
        let sub = subscription(false, -5, false);
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Skip);
    }

    #[test]
    fn warns_once_inside_window() {
        // half a day remaining, warning not yet sent
        let sub = subscription(true, 12, false);
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Warn);

        let sub = subscription(true, 12, true);
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Skip);
    }

    #[test]
    fn no_warning_outside_window() {
        let sub = subscription(true, 36, false);
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Skip);
    }

    #[test]
    fn expires_after_deadline() {
        let sub = subscription(true, -1, true);
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Expire);
    }

    #[test]
    fn warning_precedes_expiry() {
        // already past the deadline but the notice never went out:
        // warn this pass, expire the next one
        let mut sub = subscription(true, -1, false);
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Warn);

        sub.warning_sent = true;
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Expire);
    }

    #[test]
    fn repeated_sweeps_converge() {
        let mut sub = subscription(true, 2, false);

        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Warn);
        sub.warning_sent = true;

        // nothing more to do until the deadline passes
        assert_eq!(plan(&sub, now(), Duration::days(1)), SweepAction::Skip);

        let later = now() + Duration::hours(3);
        assert_eq!(plan(&sub, later, Duration::days(1)), SweepAction::Expire);
        sub.active = false;
        sub.warning_sent = false;

        assert_eq!(plan(&sub, later, Duration::days(1)), SweepAction::Skip);
    }
}
