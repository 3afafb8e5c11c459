//! Wallet repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use purse_core::StorageError;
use purse_core::wallet::{Subwallet, Wallet, WalletError, WalletStore};
use purse_shared::types::{CurrencyCode, WalletId};

use super::PgStore;
use crate::entities::{subwallets, wallets};

impl WalletStore for PgStore {
    async fn create_wallet(&self) -> Result<Wallet, WalletError> {
        let wallet = Wallet::generate();

        wallets::ActiveModel {
            id: Set(wallet.id.into_inner()),
            account_id: Set(wallet.account_id.clone()),
            created_at: Set(wallet.created_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| StorageError::new("wallet.create", e))?;

        Ok(wallet)
    }

    async fn get_balance(&self, wallet_id: WalletId) -> Result<Vec<Subwallet>, WalletError> {
        if !wallet_exists(&self.db, wallet_id).await? {
            return Err(WalletError::NotFound(wallet_id));
        }

        let models = subwallets::Entity::find()
            .filter(subwallets::Column::WalletId.eq(wallet_id.into_inner()))
            .order_by_asc(subwallets::Column::Currency)
            .all(&self.db)
            .await
            .map_err(|e| StorageError::new("wallet.balance", e))?;

        Ok(models
            .into_iter()
            .map(to_domain)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// Checks whether a wallet row exists.
pub(crate) async fn wallet_exists<C: ConnectionTrait>(
    conn: &C,
    wallet_id: WalletId,
) -> Result<bool, StorageError> {
    let count = wallets::Entity::find_by_id(wallet_id.into_inner())
        .count(conn)
        .await
        .map_err(|e| StorageError::new("wallet.exists", e))?;
    Ok(count > 0)
}

/// Convert a subwallet row to the domain type.
pub(crate) fn to_domain(model: subwallets::Model) -> Result<Subwallet, StorageError> {
    let currency = CurrencyCode::parse(&model.currency)
        .map_err(|e| StorageError::new("subwallet.decode", e))?;
    Ok(Subwallet {
        wallet_id: WalletId::from_uuid(model.wallet_id),
        currency,
        amount: model.amount,
        frozen_amount: model.frozen_amount,
    })
}

/// Convert a domain subwallet to an active model with every column set.
pub(crate) fn to_active_model(subwallet: &Subwallet) -> subwallets::ActiveModel {
    subwallets::ActiveModel {
        wallet_id: Set(subwallet.wallet_id.into_inner()),
        currency: Set(subwallet.currency.as_str().to_string()),
        amount: Set(subwallet.amount),
        frozen_amount: Set(subwallet.frozen_amount),
    }
}
