//! User-facing views over the ledger.
//!
//! [`CoinHistory`] splits a user's ledger entries into coins received from
//! and coins sent to other users. Purchases are never part of it: coins
//! spent in the store show up as inventory in [`UserInfo`] instead.
//!
//! Field names follow the JSON shape the store front-end consumes
//! (`fromUser`, `toUser`, `type`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Counterparty, EngineError, LedgerEntry, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedCoins {
    #[serde(rename = "fromUser")]
    pub from_user: String,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentCoins {
    #[serde(rename = "toUser")]
    pub to_user: String,
    pub amount: i64,
}

/// Coins moved between a user and other users, in ledger order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinHistory {
    pub received: Vec<ReceivedCoins>,
    pub sent: Vec<SentCoins>,
}

/// An inventory line as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: i64,
}

/// Balance, inventory and coin history of a user, read from one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub coins: i64,
    pub inventory: Vec<InventoryItem>,
    pub history: CoinHistory,
}

/// Ids of the other accounts appearing in `entries`.
pub(crate) fn counterparty_ids(user_id: i64, entries: &[LedgerEntry]) -> Vec<i64> {
    let mut ids: Vec<i64> = entries
        .iter()
        .filter_map(|entry| match entry.receiver {
            Counterparty::Account { user_id: receiver } if entry.sender_id == user_id => {
                Some(receiver)
            }
            Counterparty::Account { user_id: receiver } if receiver == user_id => {
                Some(entry.sender_id)
            }
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Classify `entries` from the point of view of `user_id`.
///
/// `usernames` must contain every id returned by [`counterparty_ids`].
/// Entries are kept in the order given.
pub(crate) fn summarize(
    user_id: i64,
    entries: &[LedgerEntry],
    usernames: &HashMap<i64, String>,
) -> ResultEngine<CoinHistory> {
    let name_of = |id: i64| {
        usernames
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))
    };

    let mut history = CoinHistory::default();
    for entry in entries {
        let Counterparty::Account { user_id: receiver } = entry.receiver else {
            continue;
        };
        if entry.sender_id == user_id {
            history.sent.push(SentCoins {
                to_user: name_of(receiver)?,
                amount: entry.amount,
            });
        } else if receiver == user_id {
            history.received.push(ReceivedCoins {
                from_user: name_of(entry.sender_id)?,
                amount: entry.amount,
            });
        }
    }
    Ok(history)
}
