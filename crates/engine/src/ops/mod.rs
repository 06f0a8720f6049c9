use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::{Account, EngineError, ResultEngine};

mod accounts;
mod history;
mod purchase;
mod transfer;

/// Coins granted to every new account.
pub const DEFAULT_STARTING_GRANT: i64 = 1000;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The block is an async body returning `ResultEngine<T>`; `?` inside it
/// lands in the rollback branch. If the calling future is dropped before
/// completion the transaction is dropped too, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::error!("rollback failed: {rollback_err}");
                }
                if err.is_transient() {
                    tracing::warn!("unit of work rolled back: {err}");
                } else {
                    tracing::debug!("unit of work rejected: {err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    starting_grant: i64,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Coins credited to accounts created by [`Engine::open_account`].
    pub fn starting_grant(&self) -> i64 {
        self.starting_grant
    }
}

/// Load an account or fail with [`EngineError::AccountNotFound`].
async fn require_account<C: ConnectionTrait>(db: &C, user_id: i64) -> ResultEngine<Account> {
    crate::accounts::get_by_id(db, user_id)
        .await?
        .ok_or_else(|| EngineError::AccountNotFound(user_id.to_string()))
}

/// Reject the operation if `account` cannot pay `amount`.
fn ensure_funds(account: &Account, amount: i64) -> ResultEngine<()> {
    if account.balance < amount {
        return Err(EngineError::InsufficientBalance {
            needed: amount,
            available: account.balance,
        });
    }
    Ok(())
}

fn normalize_required_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    starting_grant: i64,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            starting_grant: DEFAULT_STARTING_GRANT,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Coins granted to new accounts (defaults to [`DEFAULT_STARTING_GRANT`]).
    pub fn starting_grant(mut self, coins: i64) -> EngineBuilder {
        self.starting_grant = coins;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.starting_grant < 0 {
            return Err(EngineError::InvalidAmount(
                "starting grant must be >= 0".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            starting_grant: self.starting_grant,
        })
    }
}
