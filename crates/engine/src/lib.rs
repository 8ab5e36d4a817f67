//! # Custodia Rollover Engine
//!
//! The execution side of the authorization boundary: this crate verifies a
//! proposed batch's signature, resolves its cycle steps against the
//! controller registry, dispatches them strictly in order, and settles the
//! result into the ledger.
//!
//! ## Architectural Principles
//!
//! - **All-or-Nothing:** A batch either settles completely or leaves the
//!   ledger and analytics log untouched. The first failing step aborts the
//!   batch with its position and reason; there are no retries.
//! - **Never Bypass the Ledger:** The engine owns controller registrations
//!   and orchestration, but every balance mutation goes through the ledger's
//!   own operations and the events it emits.
//! - **Verify Before Anything:** Signature verification happens before any
//!   controller is resolved or invoked, so a tampered batch cannot even
//!   probe the registry.

use analytics::BalanceTracker;
use authorizer::signer::verify_batch;
use chrono::Utc;
use controllers::Controller;
use core_types::{Address, Caller, ControllerId, CycleDirection, RolloverBatch};
use ledger::Ledger;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub mod error;
pub mod receipt;

pub use error::EngineError;
pub use receipt::{BatchReceipt, BatchState};

/// One registered controller adapter.
pub struct ControllerRegistration {
    pub adapter: Arc<dyn Controller>,
    /// Marks adapters (e.g. swap routers) that may be invoked without the
    /// strategy-pause check applied to yield-deploy adapters.
    pub allows_unchecked_caller: bool,
}

/// Whether the strategy is currently mid-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    Idle,
    Rollover,
}

/// The rollover execution engine for a single strategy.
///
/// Holds the controller registry and handles to the shared ledger and
/// analytics tracker. Mutating operations take `&mut self`: the host is
/// expected to serialize batches per strategy, matching the ledger's
/// serialized-mutation model.
pub struct RolloverEngine {
    strategy: Address,
    verifier_secret: String,
    controllers: HashMap<ControllerId, ControllerRegistration>,
    ledger: Arc<Mutex<Ledger>>,
    tracker: Arc<Mutex<BalanceTracker>>,
    phase: CyclePhase,
}

impl RolloverEngine {
    /// Creates an engine for `strategy`, verifying batches against
    /// `verifier_secret` and settling into the given ledger and tracker.
    pub fn new(
        strategy: Address,
        verifier_secret: String,
        ledger: Arc<Mutex<Ledger>>,
        tracker: Arc<Mutex<BalanceTracker>>,
    ) -> Self {
        Self {
            strategy,
            verifier_secret,
            controllers: HashMap::new(),
            ledger,
            tracker,
            phase: CyclePhase::Idle,
        }
    }

    // --- Controller registry ------------------------------------------------

    /// Registers (or replaces) a controller adapter under `id`. Owner only.
    pub fn register_controller(
        &mut self,
        caller: &Caller,
        id: ControllerId,
        adapter: Arc<dyn Controller>,
        allows_unchecked_caller: bool,
    ) -> Result<(), EngineError> {
        self.require_owner(caller)?;
        tracing::info!(controller = ?id, allows_unchecked_caller, "controller registered");
        self.controllers.insert(
            id,
            ControllerRegistration {
                adapter,
                allows_unchecked_caller,
            },
        );
        Ok(())
    }

    /// Removes a controller registration. Owner only; idempotent.
    pub fn unregister_controller(
        &mut self,
        caller: &Caller,
        id: ControllerId,
    ) -> Result<(), EngineError> {
        self.require_owner(caller)?;
        if self.controllers.remove(&id).is_some() {
            tracing::info!(controller = ?id, "controller unregistered");
        }
        Ok(())
    }

    // --- Cycle phase --------------------------------------------------------

    /// Marks the strategy mid-rollover. While paused, batches containing
    /// steps without `allows_unchecked_caller` are refused.
    pub fn start_cycle_rollover(&mut self, caller: &Caller) -> Result<(), EngineError> {
        self.require_strategy_or_owner(caller)?;
        self.phase = CyclePhase::Rollover;
        tracing::info!(strategy = %self.strategy, "cycle rollover started");
        Ok(())
    }

    pub fn end_cycle_rollover(&mut self, caller: &Caller) -> Result<(), EngineError> {
        self.require_strategy_or_owner(caller)?;
        self.phase = CyclePhase::Idle;
        tracing::info!(strategy = %self.strategy, "cycle rollover ended");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.phase == CyclePhase::Rollover
    }

    // --- Batch execution ----------------------------------------------------

    /// Drives one signed batch through
    /// `Proposed → Verified → Executing → Settled`.
    ///
    /// On any failure the corresponding `EngineError` is returned and no
    /// ledger or analytics state is touched; see
    /// [`EngineError::terminal_state`] for the state the batch ended in.
    pub async fn execute(
        &mut self,
        direction: CycleDirection,
        user: Address,
        batch: &RolloverBatch,
    ) -> Result<BatchReceipt, EngineError> {
        let batch_id = Uuid::new_v4();
        tracing::info!(
            %batch_id,
            strategy = %self.strategy,
            token = %batch.token,
            ?direction,
            steps = batch.steps.len(),
            "batch proposed"
        );

        // 1. Verify. A batch whose signature does not cover exactly these
        //    steps in exactly this order is rejected before anything else.
        if !verify_batch(
            &self.verifier_secret,
            &batch.token,
            &batch.amount,
            &batch.steps,
            &batch.signature,
        ) {
            tracing::warn!(%batch_id, "batch rejected: invalid signature");
            return Err(EngineError::InvalidSignature);
        }
        tracing::debug!(%batch_id, "batch verified");

        // 2. Resolve every step up front so an unknown controller or a
        //    pause violation aborts before any adapter runs.
        let mut resolved = Vec::with_capacity(batch.steps.len());
        for (position, step) in batch.steps.iter().enumerate() {
            let registration = self.controllers.get(&step.controller_id).ok_or(
                EngineError::UnknownController {
                    position,
                    controller_id: step.controller_id,
                },
            )?;
            if !registration.allows_unchecked_caller && self.phase == CyclePhase::Rollover {
                return Err(EngineError::StrategyPaused {
                    position,
                    controller_id: step.controller_id,
                });
            }
            resolved.push((position, step, registration));
        }

        // 3. Dispatch strictly in order; the first failure aborts the batch.
        let mut outcomes = Vec::with_capacity(resolved.len());
        for (position, step, registration) in resolved {
            tracing::debug!(%batch_id, position, controller = ?step.controller_id, "dispatching step");
            let invocation = match direction {
                CycleDirection::Deposit => registration.adapter.deploy(&step.payload),
                // Swap legs of a withdraw cycle still enter through deploy.
                CycleDirection::Withdraw if registration.allows_unchecked_caller => {
                    registration.adapter.deploy(&step.payload)
                }
                CycleDirection::Withdraw => registration.adapter.withdraw(&step.payload),
            };
            let outcome = invocation.await.map_err(|source| {
                tracing::error!(%batch_id, position, controller = ?step.controller_id, %source, "step failed, batch aborted");
                EngineError::StepFailed {
                    position,
                    controller_id: step.controller_id,
                    source,
                }
            })?;
            outcomes.push(outcome);
        }

        // 4. Settle into the ledger and feed the analytics log.
        let events = self.settle(direction, user, batch).await?;
        let receipt = BatchReceipt {
            batch_id,
            state: BatchState::Settled,
            outcomes,
            events,
        };
        tracing::info!(%batch_id, "batch settled");
        Ok(receipt)
    }

    async fn settle(
        &self,
        direction: CycleDirection,
        user: Address,
        batch: &RolloverBatch,
    ) -> Result<Vec<events::LedgerEvent>, EngineError> {
        let now = Utc::now();
        let mut ledger = self.ledger.lock().await;
        let events = match direction {
            CycleDirection::Deposit => {
                vec![ledger.deposit(user, batch.token, self.strategy, batch.amount, now)?]
            }
            CycleDirection::Withdraw => {
                // For withdraw cycles the batch amount is a percentage of
                // the user's balance, converted at settle time.
                let balance = ledger.balance_of(&batch.token, &self.strategy, &user);
                let amount = balance * batch.amount / dec!(100);
                vec![ledger.withdraw_by_strategy_for_user(
                    &Caller::Strategy(self.strategy),
                    batch.token,
                    user,
                    amount,
                    now,
                )?]
            }
        };
        drop(ledger);

        let mut tracker = self.tracker.lock().await;
        for event in &events {
            tracker.record(event);
        }
        Ok(events)
    }

    // --- Internals ----------------------------------------------------------

    fn require_owner(&self, caller: &Caller) -> Result<(), EngineError> {
        match caller {
            Caller::Owner => Ok(()),
            _ => Err(EngineError::Unauthorized { required: "owner" }),
        }
    }

    fn require_strategy_or_owner(&self, caller: &Caller) -> Result<(), EngineError> {
        match caller {
            Caller::Owner => Ok(()),
            Caller::Strategy(addr) if *addr == self.strategy => Ok(()),
            _ => Err(EngineError::Unauthorized {
                required: "strategy",
            }),
        }
    }
}
