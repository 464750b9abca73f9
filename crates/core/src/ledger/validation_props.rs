//! Property-based tests for balance arithmetic.
//!
//! Drives an in-memory two-account ledger through random operations using
//! the same guards the repositories enforce, then checks the conservation,
//! zero-floor and replay invariants.

use proptest::prelude::*;
use tally_shared::types::Amount;

use super::audit::audit;
use super::types::TransactionKind;
use super::validation::{checked_credit, checked_debit};

#[derive(Debug, Clone)]
enum Op {
    Transfer { from_a: bool, amount: i64 },
    Debit { on_a: bool, amount: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 1i64..500).prop_map(|(from_a, amount)| Op::Transfer { from_a, amount }),
        (any::<bool>(), 1i64..500).prop_map(|(on_a, amount)| Op::Debit { on_a, amount }),
    ]
}

#[derive(Default)]
struct Account {
    balance: i64,
    log: Vec<(TransactionKind, i64)>,
}

impl Account {
    fn seeded(amount: i64) -> Self {
        Self {
            balance: amount,
            log: vec![(TransactionKind::Credit, amount)],
        }
    }
}

fn transfer(sender: &mut Account, receiver: &mut Account, amount: Amount) -> bool {
    let Ok(next_sender) = checked_debit(sender.balance, amount) else {
        return false;
    };
    let Ok(next_receiver) = checked_credit(receiver.balance, amount) else {
        return false;
    };
    sender.balance = next_sender;
    receiver.balance = next_receiver;
    sender.log.push((TransactionKind::TransferOut, amount.get()));
    receiver.log.push((TransactionKind::TransferIn, amount.get()));
    true
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Transfers conserve the pair total; balances never go negative;
    /// each balance equals the replay of its own log.
    #[test]
    fn prop_transfers_conserve_and_replay(
        seed_a in 0i64..2_000,
        seed_b in 0i64..2_000,
        ops in prop::collection::vec(op_strategy(), 0..64),
    ) {
        let mut a = if seed_a > 0 { Account::seeded(seed_a) } else { Account::default() };
        let mut b = if seed_b > 0 { Account::seeded(seed_b) } else { Account::default() };
        let mut total = seed_a + seed_b;

        for op in ops {
            match op {
                Op::Transfer { from_a, amount } => {
                    let amount = Amount::new(amount).unwrap();
                    let before = (a.balance, b.balance);
                    let applied = if from_a {
                        transfer(&mut a, &mut b, amount)
                    } else {
                        transfer(&mut b, &mut a, amount)
                    };
                    if !applied {
                        prop_assert_eq!((a.balance, b.balance), before);
                    }
                }
                Op::Debit { on_a, amount } => {
                    let amount = Amount::new(amount).unwrap();
                    let account = if on_a { &mut a } else { &mut b };
                    match checked_debit(account.balance, amount) {
                        Ok(next) => {
                            account.balance = next;
                            account.log.push((TransactionKind::Debit, amount.get()));
                            total -= amount.get();
                        }
                        Err(_) => prop_assert!(account.balance < amount.get()),
                    }
                }
            }
            prop_assert!(a.balance >= 0);
            prop_assert!(b.balance >= 0);
            prop_assert_eq!(a.balance + b.balance, total);
        }

        prop_assert!(audit(a.balance, a.log.iter().copied()).unwrap().is_consistent());
        prop_assert!(audit(b.balance, b.log.iter().copied()).unwrap().is_consistent());
    }

    /// A debit either succeeds leaving a non-negative balance or fails
    /// leaving the balance untouched.
    #[test]
    fn prop_debit_respects_floor(balance in 0i64..10_000, amount in 1i64..20_000) {
        let amount = Amount::new(amount).unwrap();
        match checked_debit(balance, amount) {
            Ok(next) => {
                prop_assert!(next >= 0);
                prop_assert_eq!(next + amount.get(), balance);
            }
            Err(_) => prop_assert!(balance < amount.get()),
        }
    }
}
