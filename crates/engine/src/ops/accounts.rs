use sea_orm::TransactionTrait;

use crate::{Account, EngineError, Item, ResultEngine, accounts, items};

use super::{Engine, normalize_required_name, require_account, with_tx};

impl Engine {
    /// Register a new account credited with the starting grant.
    pub async fn open_account(&self, username: &str) -> ResultEngine<Account> {
        let username = normalize_required_name(username).ok_or_else(|| {
            EngineError::InvalidUsername("username must not be empty".to_string())
        })?;
        let starting_grant = self.starting_grant;

        with_tx!(self, |db_tx| {
            if accounts::get_by_username(&db_tx, &username)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingAccount(username.clone()));
            }
            let account = accounts::insert(&db_tx, &username, starting_grant).await?;
            tracing::info!(
                user_id = account.user_id,
                username = %account.username,
                "account opened"
            );
            Ok(account)
        })
    }

    /// Return an account by id.
    pub async fn account(&self, user_id: i64) -> ResultEngine<Account> {
        require_account(&self.database, user_id).await
    }

    /// Resolve a display name to its account.
    pub async fn account_by_username(&self, username: &str) -> ResultEngine<Account> {
        let username = username.trim();
        accounts::get_by_username(&self.database, username)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(username.to_string()))
    }

    /// The store catalog, ordered by item name.
    pub async fn catalog(&self) -> ResultEngine<Vec<Item>> {
        items::list(&self.database).await
    }
}
