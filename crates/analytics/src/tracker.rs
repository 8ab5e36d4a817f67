use crate::error::AnalyticsError;
use chrono::{DateTime, Utc};
use core_types::Address;
use events::{LedgerEvent, LedgerEventKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The default reporting period, one day.
pub const DEFAULT_RECORD_PERIOD_SECS: i64 = 86_400;

/// One period's deposit and withdraw sums for a tracked scope.
///
/// `bucket_start` is the floor-aligned unix timestamp (seconds) that opens
/// the period. An event landing exactly on a period boundary is counted in
/// the bucket that starts at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub bucket_start: i64,
    pub deposit: Decimal,
    pub withdraw: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    deposit: Decimal,
    withdraw: Decimal,
}

/// Scope key for a user-directed row: `(strategy, user, token)`.
type UserKey = (Address, Address, Address);
/// Scope key for a manager-level aggregate: `(strategy, token)`.
type ManagerKey = (Address, Address);

/// The time-bucketed log of balance movements.
///
/// Fed by `LedgerEvent`s, it maintains one row per distinct
/// `(strategy, user, token, bucket_start)` plus a manager-level aggregate
/// across all users of the same strategy and token. Buckets are append-only
/// and never deleted.
#[derive(Debug, Clone)]
pub struct BalanceTracker {
    period_secs: i64,
    user_rows: HashMap<UserKey, BTreeMap<i64, Sums>>,
    manager_rows: HashMap<ManagerKey, BTreeMap<i64, Sums>>,
}

impl BalanceTracker {
    /// Creates a tracker with the given record period in seconds.
    pub fn new(period_secs: i64) -> Result<Self, AnalyticsError> {
        if period_secs <= 0 {
            return Err(AnalyticsError::InvalidRecordPeriod(period_secs));
        }
        Ok(Self {
            period_secs,
            user_rows: HashMap::new(),
            manager_rows: HashMap::new(),
        })
    }

    /// Creates a tracker with the default one-day period.
    pub fn with_default_period() -> Self {
        Self::new(DEFAULT_RECORD_PERIOD_SECS).expect("default period is positive")
    }

    pub fn record_period_secs(&self) -> i64 {
        self.period_secs
    }

    /// Floor-aligns a timestamp to the start of its bucket.
    fn bucket_start(&self, at: DateTime<Utc>) -> i64 {
        let ts = at.timestamp();
        ts - ts.rem_euclid(self.period_secs)
    }

    /// Folds one ledger event into the user row and the manager aggregate.
    pub fn record(&mut self, event: &LedgerEvent) {
        let bucket = self.bucket_start(event.timestamp);
        tracing::debug!(
            strategy = %event.strategy,
            user = %event.user,
            token = %event.token,
            bucket,
            "recording {:?} of {}",
            event.kind,
            event.amount
        );

        let user_sums = self
            .user_rows
            .entry((event.strategy, event.user, event.token))
            .or_default()
            .entry(bucket)
            .or_default();
        apply(user_sums, event.kind, event.amount);

        let manager_sums = self
            .manager_rows
            .entry((event.strategy, event.token))
            .or_default()
            .entry(bucket)
            .or_default();
        apply(manager_sums, event.kind, event.amount);
    }

    /// Buckets for one user's movements through a strategy, ascending by
    /// `bucket_start`, restricted to `bucket_start ∈ [from, to]`.
    ///
    /// An empty or inverted range yields an empty vector, not an error.
    pub fn user_balances(
        &self,
        strategy: &Address,
        user: &Address,
        token: &Address,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<TimeBucket> {
        collect_range(
            self.user_rows.get(&(*strategy, *user, *token)),
            from.timestamp(),
            to.timestamp(),
        )
    }

    /// Buckets aggregated across all users of a strategy and token.
    pub fn manager_balances(
        &self,
        strategy: &Address,
        token: &Address,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<TimeBucket> {
        collect_range(
            self.manager_rows.get(&(*strategy, *token)),
            from.timestamp(),
            to.timestamp(),
        )
    }
}

fn apply(sums: &mut Sums, kind: LedgerEventKind, amount: Decimal) {
    match kind {
        LedgerEventKind::Deposit => sums.deposit += amount,
        LedgerEventKind::Withdraw => sums.withdraw += amount,
    }
}

fn collect_range(rows: Option<&BTreeMap<i64, Sums>>, from: i64, to: i64) -> Vec<TimeBucket> {
    let Some(rows) = rows else {
        return Vec::new();
    };
    if from > to {
        return Vec::new();
    }
    rows.range(from..=to)
        .map(|(bucket_start, sums)| TimeBucket {
            bucket_start: *bucket_start,
            deposit: sums.deposit,
            withdraw: sums.withdraw,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PERIOD: i64 = 1_000;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    fn event(kind: LedgerEventKind, amount: Decimal, ts: i64, user: Address) -> LedgerEvent {
        LedgerEvent {
            timestamp: at(ts),
            token: addr(1),
            strategy: addr(2),
            user,
            kind,
            amount,
        }
    }

    fn tracker() -> BalanceTracker {
        BalanceTracker::new(PERIOD).unwrap()
    }

    #[test]
    fn rejects_non_positive_period() {
        assert!(BalanceTracker::new(0).is_err());
        assert!(BalanceTracker::new(-60).is_err());
    }

    #[test]
    fn events_within_one_period_share_a_bucket() {
        let mut t = tracker();
        let user = addr(3);
        t.record(&event(LedgerEventKind::Deposit, dec!(1000), 2_100, user));
        t.record(&event(LedgerEventKind::Deposit, dec!(1000), 2_900, user));
        t.record(&event(LedgerEventKind::Withdraw, dec!(300), 2_500, user));

        let buckets = t.user_balances(&addr(2), &user, &addr(1), at(0), at(10_000));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].bucket_start, 2_000);
        assert_eq!(buckets[0].deposit, dec!(2000));
        assert_eq!(buckets[0].withdraw, dec!(300));
    }

    #[test]
    fn boundary_event_opens_the_new_bucket() {
        let mut t = tracker();
        let user = addr(3);
        // One second before the boundary, exactly on it, and one after.
        t.record(&event(LedgerEventKind::Deposit, dec!(1), 1_999, user));
        t.record(&event(LedgerEventKind::Deposit, dec!(2), 2_000, user));
        t.record(&event(LedgerEventKind::Deposit, dec!(4), 2_001, user));

        let buckets = t.user_balances(&addr(2), &user, &addr(1), at(0), at(10_000));
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_start, 1_000);
        assert_eq!(buckets[0].deposit, dec!(1));
        assert_eq!(buckets[1].bucket_start, 2_000);
        assert_eq!(buckets[1].deposit, dec!(6));
    }

    #[test]
    fn query_range_is_inclusive_and_ascending() {
        let mut t = tracker();
        let user = addr(3);
        for ts in [500, 1_500, 2_500, 3_500] {
            t.record(&event(LedgerEventKind::Deposit, dec!(10), ts, user));
        }

        // [1_000, 3_000] keeps the buckets starting at 1_000, 2_000, 3_000.
        let buckets = t.user_balances(&addr(2), &user, &addr(1), at(1_000), at(3_000));
        let starts: Vec<i64> = buckets.iter().map(|b| b.bucket_start).collect();
        assert_eq!(starts, vec![1_000, 2_000, 3_000]);
    }

    #[test]
    fn inverted_or_empty_range_yields_empty_sequence() {
        let mut t = tracker();
        let user = addr(3);
        t.record(&event(LedgerEventKind::Deposit, dec!(10), 1_500, user));

        assert!(t
            .user_balances(&addr(2), &user, &addr(1), at(3_000), at(2_000))
            .is_empty());
        assert!(t
            .user_balances(&addr(2), &user, &addr(1), at(5_000), at(9_000))
            .is_empty());
        // Unknown scope entirely.
        assert!(t
            .user_balances(&addr(7), &user, &addr(1), at(0), at(10_000))
            .is_empty());
    }

    #[test]
    fn manager_row_aggregates_across_users() {
        let mut t = tracker();
        t.record(&event(LedgerEventKind::Deposit, dec!(1000), 2_100, addr(3)));
        t.record(&event(LedgerEventKind::Deposit, dec!(500), 2_200, addr(4)));
        t.record(&event(LedgerEventKind::Withdraw, dec!(200), 2_300, addr(4)));

        let manager = t.manager_balances(&addr(2), &addr(1), at(0), at(10_000));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager[0].deposit, dec!(1500));
        assert_eq!(manager[0].withdraw, dec!(200));

        // The per-user rows stay separate.
        let u1 = t.user_balances(&addr(2), &addr(3), &addr(1), at(0), at(10_000));
        assert_eq!(u1[0].deposit, dec!(1000));
        assert_eq!(u1[0].withdraw, Decimal::ZERO);
    }

    #[test]
    fn tokens_are_tracked_independently() {
        let mut t = tracker();
        let user = addr(3);
        let mut other_token = event(LedgerEventKind::Deposit, dec!(77), 2_100, user);
        other_token.token = addr(8);
        t.record(&event(LedgerEventKind::Deposit, dec!(10), 2_100, user));
        t.record(&other_token);

        let buckets = t.user_balances(&addr(2), &user, &addr(1), at(0), at(10_000));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].deposit, dec!(10));
    }
}
