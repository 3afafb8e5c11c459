//! Wallet domain types and balance arithmetic.

use chrono::{DateTime, Utc};
use purse_shared::types::{CurrencyCode, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A wallet. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique identifier.
    pub id: WalletId,
    /// Account identifier handed to the wallet owner.
    pub account_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Generates a wallet with fresh identifiers.
    #[must_use]
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self {
            id: WalletId::new(),
            account_id: format!("ACC-{}", &suffix[..12]),
            created_at: Utc::now(),
        }
    }
}

/// Largest amount a balance or request may hold: `NUMERIC(28, 8)`, i.e.
/// `99999999999999999999.99999999`.
pub const MAX_AMOUNT: Decimal =
    Decimal::from_parts(268_435_455, 1_042_612_833, 542_101_086, false, 8);

/// Adding to a balance would exceed [`MAX_AMOUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("balance overflow: result exceeds {}", MAX_AMOUNT)]
pub struct BalanceOverflow;

fn bounded_add(balance: Decimal, amount: Decimal) -> Result<Decimal, BalanceOverflow> {
    balance
        .checked_add(amount)
        .filter(|sum| *sum <= MAX_AMOUNT)
        .ok_or(BalanceOverflow)
}

/// Funds placed in escrow by [`Subwallet::reserve_debit`].
///
/// A hold must be handed back to [`Subwallet::settle_debit`], which either
/// consumes it or reverses it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a hold must be settled"]
pub struct Hold {
    amount: Decimal,
}

impl Hold {
    /// Amount held in escrow.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Result of settling a withdrawal hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitSettlement {
    /// The settled balance covered the request and was debited.
    Settled,
    /// The settled balance was too small; nothing was debited.
    InsufficientFunds {
        /// Settled balance at settlement time.
        available: Decimal,
    },
}

/// Per-currency balance partition of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subwallet {
    /// Owning wallet.
    pub wallet_id: WalletId,
    /// Currency of this partition.
    pub currency: CurrencyCode,
    /// Settled balance.
    pub amount: Decimal,
    /// Escrowed balance of in-flight operations.
    pub frozen_amount: Decimal,
}

impl Subwallet {
    /// A zero-balance subwallet.
    #[must_use]
    pub const fn empty(wallet_id: WalletId, currency: CurrencyCode) -> Self {
        Self {
            wallet_id,
            currency,
            amount: Decimal::ZERO,
            frozen_amount: Decimal::ZERO,
        }
    }

    /// Both balances are non-negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.amount.is_sign_negative() && !self.frozen_amount.is_sign_negative()
    }

    /// Invoice step 1: escrow an incoming credit.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` if the frozen balance would exceed
    /// [`MAX_AMOUNT`]. The subwallet is unchanged in that case.
    pub fn reserve_credit(&mut self, amount: Decimal) -> Result<(), BalanceOverflow> {
        self.frozen_amount = bounded_add(self.frozen_amount, amount)?;
        Ok(())
    }

    /// Invoice step 3: move the whole frozen balance into the settled one.
    ///
    /// Returns the amount moved.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` if the settled balance would exceed
    /// [`MAX_AMOUNT`]. The subwallet is unchanged in that case.
    pub fn settle_credit(&mut self) -> Result<Decimal, BalanceOverflow> {
        let moved = self.frozen_amount;
        self.amount = bounded_add(self.amount, moved)?;
        self.frozen_amount = Decimal::ZERO;
        Ok(moved)
    }

    /// Withdraw step 2: place `amount` in escrow for a pending debit.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` if the frozen balance would exceed
    /// [`MAX_AMOUNT`]. The subwallet is unchanged in that case.
    pub fn reserve_debit(&mut self, amount: Decimal) -> Result<Hold, BalanceOverflow> {
        self.frozen_amount = bounded_add(self.frozen_amount, amount)?;
        Ok(Hold { amount })
    }

    /// Withdraw step 4: release the hold and debit the settled balance if
    /// it covers the request.
    ///
    /// The hold leaves escrow on both paths, so `frozen_amount` returns to
    /// its value before [`Self::reserve_debit`] and `amount` is only ever
    /// reduced down to zero.
    pub fn settle_debit(&mut self, hold: Hold) -> DebitSettlement {
        self.frozen_amount -= hold.amount;
        if self.amount >= hold.amount {
            self.amount -= hold.amount;
            DebitSettlement::Settled
        } else {
            DebitSettlement::InsufficientFunds {
                available: self.amount,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal, frozen_amount: Decimal) -> Subwallet {
        Subwallet {
            wallet_id: WalletId::new(),
            currency: CurrencyCode::parse("USD").unwrap(),
            amount,
            frozen_amount,
        }
    }

    #[test]
    fn test_generate_wallet_account_id() {
        let wallet = Wallet::generate();
        assert!(wallet.account_id.starts_with("ACC-"));
        assert_eq!(wallet.account_id.len(), 16);
        assert_ne!(wallet.id, Wallet::generate().id);
    }

    #[test]
    fn test_credit_moves_whole_frozen_balance() {
        let mut sub = usd(dec!(10), dec!(0));
        sub.reserve_credit(dec!(100)).unwrap();
        assert_eq!(sub.frozen_amount, dec!(100));

        assert_eq!(sub.settle_credit().unwrap(), dec!(100));
        assert_eq!(sub.amount, dec!(110));
        assert_eq!(sub.frozen_amount, dec!(0));
    }

    #[test]
    fn test_debit_with_sufficient_funds() {
        let mut sub = usd(dec!(100), dec!(0));
        let hold = sub.reserve_debit(dec!(50)).unwrap();
        assert_eq!(sub.frozen_amount, dec!(50));

        assert_eq!(sub.settle_debit(hold), DebitSettlement::Settled);
        assert_eq!(sub.amount, dec!(50));
        assert_eq!(sub.frozen_amount, dec!(0));
    }

    #[test]
    fn test_debit_of_entire_balance() {
        let mut sub = usd(dec!(100), dec!(0));
        let hold = sub.reserve_debit(dec!(100)).unwrap();
        assert_eq!(sub.settle_debit(hold), DebitSettlement::Settled);
        assert_eq!(sub.amount, dec!(0));
        assert!(sub.is_consistent());
    }

    #[test]
    fn test_debit_with_insufficient_funds_restores_escrow() {
        let mut sub = usd(dec!(100), dec!(7));
        let hold = sub.reserve_debit(dec!(150)).unwrap();
        assert_eq!(sub.frozen_amount, dec!(157));

        assert_eq!(
            sub.settle_debit(hold),
            DebitSettlement::InsufficientFunds {
                available: dec!(100)
            }
        );
        assert_eq!(sub.amount, dec!(100));
        assert_eq!(sub.frozen_amount, dec!(7));
    }

    #[test]
    fn test_overflow_leaves_subwallet_unchanged() {
        let mut sub = usd(Decimal::MAX, dec!(0));
        sub.reserve_credit(dec!(1)).unwrap();
        assert_eq!(sub.settle_credit(), Err(BalanceOverflow));
        assert_eq!(sub.amount, Decimal::MAX);
        assert_eq!(sub.frozen_amount, dec!(1));

        let mut sub = usd(dec!(0), Decimal::MAX);
        assert!(sub.reserve_debit(dec!(1)).is_err());
        assert_eq!(sub.frozen_amount, Decimal::MAX);
    }

    #[test]
    fn test_max_amount_matches_column_range() {
        assert_eq!(MAX_AMOUNT, dec!(99999999999999999999.99999999));
    }

    #[test]
    fn test_balances_stay_within_column_range() {
        let mut sub = usd(MAX_AMOUNT - dec!(1), dec!(0));
        sub.reserve_credit(dec!(1)).unwrap();
        assert_eq!(sub.settle_credit().unwrap(), dec!(1));
        assert_eq!(sub.amount, MAX_AMOUNT);

        sub.reserve_credit(dec!(0.00000001)).unwrap();
        assert_eq!(sub.settle_credit(), Err(BalanceOverflow));
        assert_eq!(sub.amount, MAX_AMOUNT);
        assert_eq!(sub.frozen_amount, dec!(0.00000001));

        let mut sub = usd(dec!(0), MAX_AMOUNT);
        assert_eq!(sub.reserve_credit(dec!(1)), Err(BalanceOverflow));
        assert!(sub.reserve_debit(dec!(1)).is_err());
        assert_eq!(sub.frozen_amount, MAX_AMOUNT);
    }
}
