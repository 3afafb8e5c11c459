//! Wallets and per-currency subwallets.
//!
//! A wallet owns one subwallet per currency it has ever been credited in.
//! Each subwallet carries a settled `amount` and an escrowed
//! `frozen_amount`; the balance arithmetic used by the escrow engine lives
//! on [`Subwallet`].

mod error;
mod store;
mod types;

#[cfg(test)]
mod types_props;

pub use error::WalletError;
pub use store::WalletStore;
pub use types::{BalanceOverflow, DebitSettlement, Hold, MAX_AMOUNT, Subwallet, Wallet};
