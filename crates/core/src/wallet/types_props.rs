//! Property-based tests for subwallet balance arithmetic.
//!
//! - Balances never go negative under any sequence of credits and debits
//! - A debit hold is always released: frozen balance returns to its prior value
//! - Money is conserved: settled balance equals credits minus settled debits

use proptest::prelude::*;
use purse_shared::types::{CurrencyCode, WalletId};
use rust_decimal::Decimal;

use super::types::{DebitSettlement, Subwallet};

#[derive(Debug, Clone)]
enum Op {
    Credit(Decimal),
    Debit(Decimal),
}

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        positive_amount().prop_map(Op::Credit),
        positive_amount().prop_map(Op::Debit),
    ]
}

fn new_subwallet() -> Subwallet {
    Subwallet::empty(WalletId::new(), CurrencyCode::parse("USD").unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* sequence of completed operations, both balances stay non-negative.
    #[test]
    fn prop_balances_never_negative(ops in prop::collection::vec(op_strategy(), 0..50)) {
        let mut sub = new_subwallet();
        for op in ops {
            match op {
                Op::Credit(amount) => {
                    sub.reserve_credit(amount).unwrap();
                    prop_assert!(sub.is_consistent());
                    sub.settle_credit().unwrap();
                }
                Op::Debit(amount) => {
                    let hold = sub.reserve_debit(amount).unwrap();
                    prop_assert!(sub.is_consistent());
                    sub.settle_debit(hold);
                }
            }
            prop_assert!(sub.is_consistent());
        }
    }

    /// *For any* debit, the frozen balance after settlement equals the one before the hold.
    #[test]
    fn prop_debit_hold_always_released(
        settled in positive_amount(),
        frozen in positive_amount(),
        requested in positive_amount(),
    ) {
        let mut sub = new_subwallet();
        sub.amount = settled;
        sub.frozen_amount = frozen;

        let hold = sub.reserve_debit(requested).unwrap();
        let outcome = sub.settle_debit(hold);

        prop_assert_eq!(sub.frozen_amount, frozen);
        match outcome {
            DebitSettlement::Settled => prop_assert_eq!(sub.amount, settled - requested),
            DebitSettlement::InsufficientFunds { available } => {
                prop_assert!(requested > settled);
                prop_assert_eq!(available, settled);
                prop_assert_eq!(sub.amount, settled);
            }
        }
    }

    /// *For any* sequence, settled balance = credits - successful debits.
    #[test]
    fn prop_money_is_conserved(ops in prop::collection::vec(op_strategy(), 0..50)) {
        let mut sub = new_subwallet();
        let mut expected = Decimal::ZERO;
        for op in ops {
            match op {
                Op::Credit(amount) => {
                    sub.reserve_credit(amount).unwrap();
                    sub.settle_credit().unwrap();
                    expected += amount;
                }
                Op::Debit(amount) => {
                    let hold = sub.reserve_debit(amount).unwrap();
                    if sub.settle_debit(hold) == DebitSettlement::Settled {
                        expected -= amount;
                    }
                }
            }
        }
        prop_assert_eq!(sub.amount, expected);
        prop_assert_eq!(sub.frozen_amount, Decimal::ZERO);
    }
}
