//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a wallet id where a
//! transaction id is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate UUID-backed typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(WalletId, "Unique identifier for a wallet.");

/// Identifier of a ledger transaction.
///
/// Assigned by storage in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub i64);

impl TransactionId {
    /// Returns the raw sequence value.
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_wallet_id_roundtrips_through_string() {
        let id = WalletId::new();
        assert_eq!(WalletId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_wallet_id_rejects_garbage() {
        assert!(WalletId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_transaction_id_parse() {
        assert_eq!(TransactionId::from_str("42").unwrap(), TransactionId(42));
        assert!(TransactionId::from_str("abc").is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&WalletId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
        assert_eq!(serde_json::to_string(&TransactionId(7)).unwrap(), "7");
    }
}
