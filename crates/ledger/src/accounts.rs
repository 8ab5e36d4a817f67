use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use core_types::{Address, Caller};
use events::{LedgerEvent, LedgerEventKind};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Scope key for a single user balance: `(token, strategy, user)`.
type BalanceKey = (Address, Address, Address);
/// Scope key for a strategy total: `(token, strategy)`.
type TotalKey = (Address, Address);

/// Tracks per-user, per-strategy token balances and the derived strategy
/// totals. Its sole responsibility is to accurately reflect attribution
/// based on deposits and strategy withdrawals.
///
/// Mutations are modeled as strictly serialized: the host must not let two
/// ledger-mutating operations interleave. `&mut self` enforces that within
/// one process; hosts sharing a ledger across tasks wrap it in a mutex.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// The ledger's own identity, rejected as a registration target.
    address: Address,
    balances: HashMap<BalanceKey, Decimal>,
    strategy_totals: HashMap<TotalKey, Decimal>,
    /// Registration flag per strategy address. A flag that flips to `false`
    /// revokes withdrawal rights without clearing balances.
    registrations: HashMap<Address, bool>,
    /// Currently-active strategies in registration order.
    active: Vec<Address>,
}

impl Ledger {
    /// Creates an empty ledger owned by the host, with the given identity.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balances: HashMap::new(),
            strategy_totals: HashMap::new(),
            registrations: HashMap::new(),
            active: Vec::new(),
        }
    }

    // --- Registration -------------------------------------------------------

    /// Registers a strategy so it may receive deposits and withdraw pooled
    /// funds. Owner capability only. Idempotent.
    pub fn register_strategy(
        &mut self,
        caller: &Caller,
        strategy: Address,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if strategy.is_zero() || strategy == self.address {
            return Err(LedgerError::InvalidRegistration(strategy));
        }
        let flag = self.registrations.entry(strategy).or_insert(false);
        if !*flag {
            *flag = true;
            self.active.push(strategy);
            tracing::info!(%strategy, "strategy registered");
        }
        Ok(())
    }

    /// Revokes a strategy's deposit and withdrawal rights. Balances stay
    /// attributed; re-registration restores access to them. Idempotent.
    pub fn unregister_strategy(
        &mut self,
        caller: &Caller,
        strategy: Address,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if strategy.is_zero() || strategy == self.address {
            return Err(LedgerError::InvalidRegistration(strategy));
        }
        if let Some(flag) = self.registrations.get_mut(&strategy) {
            if *flag {
                *flag = false;
                self.active.retain(|s| *s != strategy);
                tracing::info!(%strategy, "strategy unregistered");
            }
        }
        Ok(())
    }

    /// The currently-active strategies, in registration order.
    pub fn strategies(&self) -> &[Address] {
        &self.active
    }

    pub fn is_registered(&self, strategy: &Address) -> bool {
        self.registrations.get(strategy).copied().unwrap_or(false)
    }

    // --- Mutations ----------------------------------------------------------

    /// Records a deposit of `amount` of `token` by `user`, attributed through
    /// `strategy`. The matching transfer-in is a precondition handled by the
    /// custody collaborator.
    pub fn deposit(
        &mut self,
        user: Address,
        token: Address,
        strategy: Address,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<LedgerEvent, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if !self.is_registered(&strategy) {
            return Err(LedgerError::StrategyUnavailable(strategy));
        }

        *self
            .balances
            .entry((token, strategy, user))
            .or_insert(Decimal::ZERO) += amount;
        *self
            .strategy_totals
            .entry((token, strategy))
            .or_insert(Decimal::ZERO) += amount;

        tracing::debug!(%user, %token, %strategy, %amount, "deposit recorded");

        Ok(LedgerEvent {
            timestamp: at,
            token,
            strategy,
            user,
            kind: LedgerEventKind::Deposit,
            amount,
        })
    }

    /// Pays the entire strategy total for `token` out to the calling
    /// strategy and clears every user attribution beneath it. The funds have
    /// left the ledger's custody; the strategy tracks them from here on.
    ///
    /// Returns the payout amount and one withdraw event per affected user.
    pub fn withdraw_by_strategy(
        &mut self,
        caller: &Caller,
        token: Address,
        at: DateTime<Utc>,
    ) -> Result<(Decimal, Vec<LedgerEvent>), LedgerError> {
        let strategy = self.require_active_strategy(caller)?;

        let payout = self
            .strategy_totals
            .insert((token, strategy), Decimal::ZERO)
            .unwrap_or(Decimal::ZERO);

        let mut events = Vec::new();
        for ((t, s, user), balance) in self.balances.iter_mut() {
            if *t == token && *s == strategy && !balance.is_zero() {
                events.push(LedgerEvent {
                    timestamp: at,
                    token,
                    strategy,
                    user: *user,
                    kind: LedgerEventKind::Withdraw,
                    amount: *balance,
                });
                *balance = Decimal::ZERO;
            }
        }
        // Deterministic event order regardless of map iteration.
        events.sort_by_key(|e| e.user);

        tracing::info!(%strategy, %token, %payout, users = events.len(), "strategy withdrawal");

        Ok((payout, events))
    }

    /// Pays `amount` of a single user's balance out to the calling strategy.
    ///
    /// Pause state is intentionally not re-checked here beyond active
    /// registration: once registered, the strategy is a trusted signer for
    /// its own users' balances.
    pub fn withdraw_by_strategy_for_user(
        &mut self,
        caller: &Caller,
        token: Address,
        user: Address,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<LedgerEvent, LedgerError> {
        let strategy = self.require_active_strategy(caller)?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let available = self.balance_of(&token, &strategy, &user);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount.to_string(),
                available: available.to_string(),
            });
        }
        let balance = self
            .balances
            .get_mut(&(token, strategy, user))
            .expect("balance entry exists when available >= amount > 0");
        *balance -= amount;

        let total = self
            .strategy_totals
            .get_mut(&(token, strategy))
            .expect("strategy total exists whenever a user balance does");
        *total -= amount;

        tracing::debug!(%strategy, %token, %user, %amount, "per-user withdrawal");

        Ok(LedgerEvent {
            timestamp: at,
            token,
            strategy,
            user,
            kind: LedgerEventKind::Withdraw,
            amount,
        })
    }

    // --- Read side ----------------------------------------------------------

    pub fn balance_of(&self, token: &Address, strategy: &Address, user: &Address) -> Decimal {
        self.balances
            .get(&(*token, *strategy, *user))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn balance_of_strategy(&self, token: &Address, strategy: &Address) -> Decimal {
        self.strategy_totals
            .get(&(*token, *strategy))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    // --- Internals ----------------------------------------------------------

    fn require_owner(&self, caller: &Caller) -> Result<(), LedgerError> {
        match caller {
            Caller::Owner => Ok(()),
            _ => Err(LedgerError::Unauthorized { required: "owner" }),
        }
    }

    /// Resolves the caller to an actively registered strategy address.
    fn require_active_strategy(&self, caller: &Caller) -> Result<Address, LedgerError> {
        match caller {
            Caller::Strategy(addr) if self.is_registered(addr) => Ok(*addr),
            Caller::Strategy(addr) => Err(LedgerError::InvalidStrategy(*addr)),
            _ => Err(LedgerError::Unauthorized {
                required: "strategy",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// Sums the user balances under a `(token, strategy)` scope the slow way.
    fn balance_sum(ledger: &Ledger, token: Address, strategy: Address, users: &[Address]) -> Decimal {
        users
            .iter()
            .map(|u| ledger.balance_of(&token, &strategy, u))
            .sum()
    }

    #[test]
    fn deposit_credits_user_and_strategy_total() {
        let (token, strategy, user) = (addr(1), addr(2), addr(3));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();

        ledger
            .deposit(user, token, strategy, dec!(20000), now())
            .unwrap();
        assert_eq!(ledger.balance_of(&token, &strategy, &user), dec!(20000));
        assert_eq!(ledger.balance_of_strategy(&token, &strategy), dec!(20000));

        ledger
            .deposit(user, token, strategy, dec!(5000), now())
            .unwrap();
        assert_eq!(ledger.balance_of(&token, &strategy, &user), dec!(25000));
        assert_eq!(ledger.balance_of_strategy(&token, &strategy), dec!(25000));
    }

    #[test]
    fn deposit_to_unregistered_strategy_fails_without_state_change() {
        let (token, strategy, user) = (addr(1), addr(2), addr(3));
        let mut ledger = Ledger::new(addr(9));

        let err = ledger
            .deposit(user, token, strategy, dec!(100), now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::StrategyUnavailable(_)));
        assert_eq!(err.kind(), core_types::FailureKind::StateGate);
        assert_eq!(ledger.balance_of(&token, &strategy, &user), Decimal::ZERO);
        assert_eq!(ledger.balance_of_strategy(&token, &strategy), Decimal::ZERO);
    }

    #[test]
    fn deposit_rejects_non_positive_amount() {
        let (token, strategy, user) = (addr(1), addr(2), addr(3));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();

        assert!(matches!(
            ledger.deposit(user, token, strategy, Decimal::ZERO, now()),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.deposit(user, token, strategy, dec!(-5), now()),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn registration_requires_owner_and_valid_target() {
        let mut ledger = Ledger::new(addr(9));

        assert!(matches!(
            ledger.register_strategy(&Caller::User(addr(3)), addr(2)),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            ledger.register_strategy(&Caller::Owner, Address::ZERO),
            Err(LedgerError::InvalidRegistration(_))
        ));
        // The ledger's own address is not a valid strategy either.
        let err = ledger.register_strategy(&Caller::Owner, addr(9)).unwrap_err();
        assert_eq!(err.kind(), core_types::FailureKind::Config);
    }

    #[test]
    fn register_unregister_toggles_active_list() {
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, addr(1)).unwrap();
        ledger.register_strategy(&Caller::Owner, addr(2)).unwrap();
        assert_eq!(ledger.strategies(), &[addr(1), addr(2)]);

        ledger.unregister_strategy(&Caller::Owner, addr(1)).unwrap();
        assert_eq!(ledger.strategies(), &[addr(2)]);
        assert!(!ledger.is_registered(&addr(1)));

        // Idempotent both ways.
        ledger.unregister_strategy(&Caller::Owner, addr(1)).unwrap();
        ledger.register_strategy(&Caller::Owner, addr(2)).unwrap();
        assert_eq!(ledger.strategies(), &[addr(2)]);
    }

    #[test]
    fn withdraw_by_strategy_pays_total_and_zeroes_every_user() {
        let (token, strategy) = (addr(1), addr(2));
        let (u1, u2) = (addr(3), addr(4));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();
        ledger.deposit(u1, token, strategy, dec!(20000), now()).unwrap();
        ledger.deposit(u1, token, strategy, dec!(5000), now()).unwrap();
        ledger.deposit(u2, token, strategy, dec!(3500), now()).unwrap();

        let (payout, events) = ledger
            .withdraw_by_strategy(&Caller::Strategy(strategy), token, now())
            .unwrap();

        assert_eq!(payout, dec!(28500));
        assert_eq!(ledger.balance_of(&token, &strategy, &u1), Decimal::ZERO);
        assert_eq!(ledger.balance_of(&token, &strategy, &u2), Decimal::ZERO);
        assert_eq!(ledger.balance_of_strategy(&token, &strategy), Decimal::ZERO);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].user, u1);
        assert_eq!(events[0].amount, dec!(25000));
        assert_eq!(events[1].user, u2);
        assert_eq!(events[1].amount, dec!(3500));
        assert!(events.iter().all(|e| e.kind == LedgerEventKind::Withdraw));
    }

    #[test]
    fn withdraw_by_wrong_strategy_is_rejected() {
        let (token, strategy, other) = (addr(1), addr(2), addr(5));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();
        ledger
            .deposit(addr(3), token, strategy, dec!(10000), now())
            .unwrap();

        let err = ledger
            .withdraw_by_strategy(&Caller::Strategy(other), token, now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStrategy(_)));
        assert_eq!(ledger.balance_of_strategy(&token, &strategy), dec!(10000));
    }

    #[test]
    fn unregistration_blocks_withdrawal_until_re_registration() {
        let (token, strategy, user) = (addr(1), addr(2), addr(3));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();
        ledger
            .deposit(user, token, strategy, dec!(15000), now())
            .unwrap();

        ledger.unregister_strategy(&Caller::Owner, strategy).unwrap();
        let err = ledger
            .withdraw_by_strategy(&Caller::Strategy(strategy), token, now())
            .unwrap_err();
        assert_eq!(err.kind(), core_types::FailureKind::StateGate);
        // Balances were not cleared by unregistration.
        assert_eq!(ledger.balance_of(&token, &strategy, &user), dec!(15000));

        ledger.register_strategy(&Caller::Owner, strategy).unwrap();
        let (payout, _) = ledger
            .withdraw_by_strategy(&Caller::Strategy(strategy), token, now())
            .unwrap();
        assert_eq!(payout, dec!(15000));
        assert_eq!(ledger.balance_of(&token, &strategy, &user), Decimal::ZERO);
    }

    #[test]
    fn withdraw_for_user_decrements_balance_and_total() {
        let (token, strategy, user) = (addr(1), addr(2), addr(3));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();
        ledger
            .deposit(user, token, strategy, dec!(12000), now())
            .unwrap();

        let event = ledger
            .withdraw_by_strategy_for_user(
                &Caller::Strategy(strategy),
                token,
                user,
                dec!(5000),
                now(),
            )
            .unwrap();
        assert_eq!(event.amount, dec!(5000));
        assert_eq!(ledger.balance_of(&token, &strategy, &user), dec!(7000));
        assert_eq!(ledger.balance_of_strategy(&token, &strategy), dec!(7000));
    }

    #[test]
    fn withdraw_for_user_rejects_overdraw() {
        let (token, strategy, user) = (addr(1), addr(2), addr(3));
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();
        ledger
            .deposit(user, token, strategy, dec!(1000), now())
            .unwrap();

        let err = ledger
            .withdraw_by_strategy_for_user(
                &Caller::Strategy(strategy),
                token,
                user,
                dec!(1001),
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(&token, &strategy, &user), dec!(1000));
    }

    #[test]
    fn balance_sum_matches_strategy_total_across_mixed_sequences() {
        let (token, strategy) = (addr(1), addr(2));
        let users = [addr(3), addr(4), addr(5)];
        let mut ledger = Ledger::new(addr(9));
        ledger.register_strategy(&Caller::Owner, strategy).unwrap();

        let moves: &[(usize, Decimal)] = &[
            (0, dec!(100)),
            (1, dec!(250)),
            (0, dec!(50)),
            (2, dec!(999)),
            (1, dec!(-200)),
            (0, dec!(-150)),
            (2, dec!(1)),
        ];
        for (i, amount) in moves {
            if amount.is_sign_positive() {
                ledger
                    .deposit(users[*i], token, strategy, *amount, now())
                    .unwrap();
            } else {
                ledger
                    .withdraw_by_strategy_for_user(
                        &Caller::Strategy(strategy),
                        token,
                        users[*i],
                        -*amount,
                        now(),
                    )
                    .unwrap();
            }
            // The invariant holds after every single mutation.
            assert_eq!(
                balance_sum(&ledger, token, strategy, &users),
                ledger.balance_of_strategy(&token, &strategy)
            );
        }
    }
}
