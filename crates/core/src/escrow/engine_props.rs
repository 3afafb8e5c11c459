//! Property-based tests for the escrow engine.
//!
//! - Balances stay non-negative under any sequence of invoices and withdrawals
//! - The settled balance equals invoices minus successful withdrawals
//! - Every applied request leaves exactly one terminal transaction

use proptest::prelude::*;
use purse_shared::types::CurrencyCode;
use rust_decimal::Decimal;

use super::{EscrowEngine, EscrowRequest};
use crate::ledger::{TransactionLedger, TransactionStatus, TransactionType};
use crate::memory::MemoryStore;
use crate::wallet::WalletStore;

/// Strategy to generate positive decimal amounts (0.01 to 1,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op_strategy() -> impl Strategy<Value = (TransactionType, Decimal)> {
    (
        prop_oneof![Just(TransactionType::Invoice), Just(TransactionType::Withdraw)],
        positive_amount(),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// *For any* sequence, balances stay non-negative and money is conserved.
    #[test]
    fn prop_engine_conserves_money(ops in prop::collection::vec(op_strategy(), 1..30)) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            let wallet = store.create_wallet().await.unwrap();
            let engine = EscrowEngine::new(store);
            let usd = CurrencyCode::parse("USD").unwrap();

            // The first withdrawal may hit a missing subwallet; seed one.
            engine
                .invoice(&EscrowRequest::new(wallet.id, usd.clone(), Decimal::ONE, "seed").unwrap())
                .await
                .unwrap();
            let mut expected = Decimal::ONE;

            for (i, (kind, amount)) in ops.into_iter().enumerate() {
                let req = EscrowRequest::new(wallet.id, usd.clone(), amount, format!("op-{i}")).unwrap();
                let outcome = engine.apply(kind, &req).await.unwrap();

                let stored = engine.store().get_transaction(outcome.transaction.id).await.unwrap();
                prop_assert!(stored.status.is_terminal());
                if stored.status == TransactionStatus::Success {
                    match kind {
                        TransactionType::Invoice => expected += amount,
                        TransactionType::Withdraw => expected -= amount,
                    }
                } else {
                    prop_assert_eq!(kind, TransactionType::Withdraw);
                }

                let balances = engine.store().get_balance(wallet.id).await.unwrap();
                prop_assert_eq!(balances.len(), 1);
                prop_assert!(balances[0].is_consistent());
                prop_assert_eq!(balances[0].amount, expected);
                prop_assert_eq!(balances[0].frozen_amount, Decimal::ZERO);
            }
            Ok(())
        })?;
    }
}
