use chrono::{DateTime, Utc};
use core_types::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a ledger event added to or removed from a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    Deposit,
    Withdraw,
}

/// A single balance movement recorded by the ledger.
///
/// One event is emitted per `(token, strategy, user)` scope a mutation
/// touches: a deposit emits one, a whole-strategy withdrawal emits one per
/// user whose attribution was cleared. The analytics log folds these into
/// its time buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub timestamp: DateTime<Utc>,
    pub token: Address,
    pub strategy: Address,
    pub user: Address,
    pub kind: LedgerEventKind,
    pub amount: Decimal,
}
