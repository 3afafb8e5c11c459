//! Queue topics, messages and request payloads.

use std::fmt;
use std::str::FromStr;

use purse_shared::types::{CurrencyCode, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::QueueError;
use crate::escrow::{
    EscrowError, EscrowRequest, MESSAGE_KEY_PREFIX, validate_amount, validate_key,
};
use crate::ledger::TransactionType;

/// Queue topic. Publishers and consumers both resolve names from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Invoice requests.
    Invoices,
    /// Withdraw requests.
    Withdrawals,
}

impl Topic {
    /// Every topic.
    pub const ALL: [Self; 2] = [Self::Invoices, Self::Withdrawals];

    /// Topic carrying requests of the given kind.
    #[must_use]
    pub const fn for_operation(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Invoice => Self::Invoices,
            TransactionType::Withdraw => Self::Withdrawals,
        }
    }

    /// Operation carried by this topic.
    #[must_use]
    pub const fn operation(self) -> TransactionType {
        match self {
            Self::Invoices => TransactionType::Invoice,
            Self::Withdrawals => TransactionType::Withdraw,
        }
    }

    /// Topic name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoices => "invoices",
            Self::Withdrawals => "withdrawals",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoices" => Ok(Self::Invoices),
            "withdrawals" => Ok(Self::Withdrawals),
            _ => Err(format!("Unknown topic: {s}")),
        }
    }
}

/// Lifecycle of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageState {
    /// Waiting for (re)delivery.
    Pending,
    /// Processed; never delivered again.
    Committed,
    /// Given up on; never delivered again.
    Dead,
}

impl MessageState {
    /// State name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Dead => "dead",
        }
    }
}

impl FromStr for MessageState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "committed" => Ok(Self::Committed),
            "dead" => Ok(Self::Dead),
            _ => Err(format!("Unknown message state: {s}")),
        }
    }
}

/// A claimed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Message id, increasing in publish order within the queue.
    pub id: i64,
    /// Source topic.
    pub topic: Topic,
    /// Raw payload.
    pub payload: String,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
}

impl Delivery {
    /// Idempotency key used when the payload carries no `request_id`.
    ///
    /// Lives under [`MESSAGE_KEY_PREFIX`], which client keys may not use.
    #[must_use]
    pub fn default_request_key(&self) -> String {
        format!("{MESSAGE_KEY_PREFIX}{}:{}", self.topic, self.id)
    }

    /// Decodes the payload into a validated request.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Malformed` if the payload is not valid JSON of
    /// the expected shape or fails request validation.
    pub fn decode(&self) -> Result<EscrowRequest, QueueError> {
        let payload: RequestPayload = serde_json::from_str(&self.payload)
            .map_err(|e| QueueError::Malformed(e.to_string()))?;
        payload
            .into_request(self.default_request_key())
            .map_err(|e| QueueError::Malformed(e.to_string()))
    }
}

/// Message body of an invoice or withdraw request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Target wallet.
    pub wallet_id: WalletId,
    /// Target currency.
    pub currency: CurrencyCode,
    /// Requested amount.
    pub amount: Decimal,
    /// Client-chosen idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RequestPayload {
    /// Checks the amount and, when present, the `request_id`.
    ///
    /// # Errors
    ///
    /// Returns `EscrowError::Validation` describing the first violation.
    pub fn validate(&self) -> Result<(), EscrowError> {
        validate_amount(self.amount)?;
        if let Some(key) = &self.request_id {
            validate_key(key)?;
        }
        Ok(())
    }

    /// Validates the payload, keyed by `request_id` or else `default_key`.
    ///
    /// # Errors
    ///
    /// Returns `EscrowError::Validation` for an invalid amount or a
    /// `request_id` rejected by [`validate_key`].
    pub fn into_request(self, default_key: String) -> Result<EscrowRequest, EscrowError> {
        let key = match self.request_id {
            Some(key) => {
                validate_key(&key)?;
                key
            }
            None => default_key,
        };
        EscrowRequest::new(self.wallet_id, self.currency, self.amount, key)
    }
}
