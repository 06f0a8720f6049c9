use std::collections::HashMap;

use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::{
    CoinHistory, InventoryItem, ResultEngine, UserInfo, accounts,
    history::{counterparty_ids, summarize},
    inventory, ledger,
};

use super::{Engine, require_account, with_tx};

async fn coin_history<C: ConnectionTrait>(db: &C, user_id: i64) -> ResultEngine<CoinHistory> {
    let entries = ledger::list_by_user(db, user_id).await?;
    let ids = counterparty_ids(user_id, &entries);
    let usernames: HashMap<i64, String> = accounts::get_many(db, &ids)
        .await?
        .into_iter()
        .map(|account| (account.user_id, account.username))
        .collect();
    summarize(user_id, &entries, &usernames)
}

impl Engine {
    /// Coins received from and sent to other users, in ledger order.
    ///
    /// Read-only; runs in its own transaction so the result is a consistent
    /// snapshot even while transfers are being committed.
    pub async fn history(&self, user_id: i64) -> ResultEngine<CoinHistory> {
        with_tx!(self, |db_tx| {
            require_account(&db_tx, user_id).await?;
            coin_history(&db_tx, user_id).await
        })
    }

    /// Balance, inventory and coin history of a user.
    pub async fn user_info(&self, user_id: i64) -> ResultEngine<UserInfo> {
        with_tx!(self, |db_tx| {
            let account = require_account(&db_tx, user_id).await?;
            let inventory = inventory::list_by_user(&db_tx, user_id)
                .await?
                .into_iter()
                .map(|(item, quantity)| InventoryItem {
                    item_type: item.name,
                    quantity,
                })
                .collect();
            let history = coin_history(&db_tx, user_id).await?;

            Ok(UserInfo {
                coins: account.balance,
                inventory,
                history,
            })
        })
    }
}
