use sea_orm::TransactionTrait;

use crate::{
    Counterparty, EngineError, LedgerEntry, NewLedgerEntry, ResultEngine, accounts, ledger,
};

use super::{Engine, ensure_funds, require_account, with_tx};

impl Engine {
    /// Move `amount` coins from `sender_id` to `receiver_id`.
    ///
    /// Debits the sender, credits the receiver and appends one ledger entry,
    /// all in one transaction. Nothing is written when the sender cannot
    /// cover the amount or either account is missing.
    pub async fn transfer(
        &self,
        sender_id: i64,
        receiver_id: i64,
        amount: i64,
    ) -> ResultEngine<LedgerEntry> {
        let new_entry = NewLedgerEntry::new(
            sender_id,
            Counterparty::Account {
                user_id: receiver_id,
            },
            amount,
        )?;

        with_tx!(self, |db_tx| {
            let sender = require_account(&db_tx, sender_id).await?;
            let receiver = require_account(&db_tx, receiver_id).await?;
            ensure_funds(&sender, amount)?;

            accounts::apply_delta(&db_tx, &sender, -amount).await?;
            accounts::apply_delta(&db_tx, &receiver, amount).await?;
            let entry = ledger::append(&db_tx, new_entry).await?;

            tracing::debug!(
                ledger_id = entry.id,
                sender_id,
                receiver_id,
                amount,
                "transfer committed"
            );
            Ok(entry)
        })
    }

    /// Resolve `receiver_username` and transfer `amount` coins to it.
    pub async fn transfer_to_username(
        &self,
        sender_id: i64,
        receiver_username: &str,
        amount: i64,
    ) -> ResultEngine<LedgerEntry> {
        let receiver = self.account_by_username(receiver_username).await?;
        if receiver.user_id == sender_id {
            return Err(EngineError::InvalidTransfer(
                "sender and receiver must differ".to_string(),
            ));
        }
        self.transfer(sender_id, receiver.user_id, amount).await
    }
}
