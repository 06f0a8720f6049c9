use sea_orm::TransactionTrait;

use crate::{
    Counterparty, EngineError, LedgerEntry, NewLedgerEntry, ResultEngine, accounts, inventory,
    items, ledger,
};

use super::{Engine, ensure_funds, normalize_required_name, require_account, with_tx};

impl Engine {
    /// Buy one unit of the catalog item called `item_name`.
    ///
    /// In one transaction: debits the item price, adds the item to the
    /// user's inventory (new row at quantity 1, or +1 on the existing row)
    /// and appends a ledger entry whose receiver is the store.
    pub async fn purchase(&self, user_id: i64, item_name: &str) -> ResultEngine<LedgerEntry> {
        let item_name = normalize_required_name(item_name).ok_or_else(|| {
            EngineError::InvalidItemName("item name must not be empty".to_string())
        })?;

        with_tx!(self, |db_tx| {
            let buyer = require_account(&db_tx, user_id).await?;
            let item = items::find_by_name(&db_tx, &item_name)
                .await?
                .ok_or_else(|| EngineError::ItemNotFound(item_name.clone()))?;
            ensure_funds(&buyer, item.price)?;

            accounts::apply_delta(&db_tx, &buyer, -item.price).await?;
            inventory::upsert(&db_tx, user_id, item.id, 1).await?;
            let entry = ledger::append(
                &db_tx,
                NewLedgerEntry::new(user_id, Counterparty::Store, item.price)?,
            )
            .await?;

            tracing::debug!(
                ledger_id = entry.id,
                user_id,
                item = %item.name,
                price = item.price,
                "purchase committed"
            );
            Ok(entry)
        })
    }
}
