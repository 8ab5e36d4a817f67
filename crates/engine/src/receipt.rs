use controllers::StepOutcome;
use events::LedgerEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The lifecycle of a proposed batch.
///
/// `Proposed → Verified → Executing → Settled` on success;
/// `Proposed → Rejected` on a signature failure and
/// `Proposed → Verified → Aborted` on any later failure. There are no
/// retries inside the engine: a failed batch is re-proposed fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Proposed,
    Verified,
    Executing,
    Settled,
    Aborted,
    Rejected,
}

/// Returned for a fully settled batch: the per-step venue outcomes and the
/// ledger events the settlement produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub batch_id: Uuid,
    pub state: BatchState,
    pub outcomes: Vec<StepOutcome>,
    pub events: Vec<LedgerEvent>,
}
