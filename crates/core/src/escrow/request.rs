//! Validated escrow requests and their outcomes.

use purse_shared::types::{CurrencyCode, WalletId};
use rust_decimal::Decimal;

use super::error::EscrowError;
use crate::ledger::TransactionRecord;
use crate::wallet::MAX_AMOUNT;

/// Most decimal places an amount may carry.
pub const MAX_AMOUNT_SCALE: u32 = 8;

/// Longest accepted idempotency key, in bytes.
pub const MAX_KEY_LEN: usize = 255;

/// Prefix of keys derived from queue message ids. Client keys may not use it.
pub const MESSAGE_KEY_PREFIX: &str = "msg:";

/// Checks that an amount is strictly positive, at most [`MAX_AMOUNT`], with
/// at most [`MAX_AMOUNT_SCALE`] decimal places.
///
/// # Errors
///
/// Returns `EscrowError::Validation` describing the violation.
pub fn validate_amount(amount: Decimal) -> Result<(), EscrowError> {
    if amount <= Decimal::ZERO {
        return Err(EscrowError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(EscrowError::Validation(format!(
            "amount must be at most {MAX_AMOUNT}, got {amount}"
        )));
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(EscrowError::Validation(format!(
            "amount must have at most {MAX_AMOUNT_SCALE} decimal places, got {amount}"
        )));
    }
    Ok(())
}

/// Checks a client-chosen idempotency key: non-blank, at most
/// [`MAX_KEY_LEN`] bytes, and outside the [`MESSAGE_KEY_PREFIX`] namespace.
///
/// # Errors
///
/// Returns `EscrowError::Validation` describing the violation.
pub fn validate_key(key: &str) -> Result<(), EscrowError> {
    if key.starts_with(MESSAGE_KEY_PREFIX) {
        return Err(EscrowError::Validation(format!(
            "idempotency key must not start with {MESSAGE_KEY_PREFIX:?}"
        )));
    }
    check_key_shape(key)
}

fn check_key_shape(key: &str) -> Result<(), EscrowError> {
    if key.trim().is_empty() {
        return Err(EscrowError::Validation(
            "idempotency key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(EscrowError::Validation(format!(
            "idempotency key must be at most {MAX_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

/// A validated invoice or withdraw request.
///
/// Construction checks everything that can be checked without storage, so
/// the engine never opens a unit for a request that is bound to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRequest {
    wallet_id: WalletId,
    currency: CurrencyCode,
    amount: Decimal,
    key: String,
}

impl EscrowRequest {
    /// Validates a request.
    ///
    /// # Errors
    ///
    /// Returns `EscrowError::Validation` if `amount` fails
    /// [`validate_amount`], or if `key` is blank or longer than
    /// [`MAX_KEY_LEN`]. Client keys are checked separately with
    /// [`validate_key`].
    pub fn new(
        wallet_id: WalletId,
        currency: CurrencyCode,
        amount: Decimal,
        key: impl Into<String>,
    ) -> Result<Self, EscrowError> {
        validate_amount(amount)?;
        let key = key.into();
        check_key_shape(&key)?;
        Ok(Self {
            wallet_id,
            currency,
            amount,
            key,
        })
    }

    /// Target wallet.
    #[must_use]
    pub const fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    /// Target currency.
    #[must_use]
    pub const fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Requested amount, always positive.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Idempotency key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Result of applying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowOutcome {
    /// Final transaction record.
    pub transaction: TransactionRecord,
    /// True if the key had already been applied and nothing changed.
    pub replayed: bool,
}
