//! The Account Store.
//!
//! An account is a user's coin balance. Balances change only through
//! [`apply_delta`], which is a compare-and-swap on the row `version`: the
//! caller passes the [`Account`] it read inside the same unit of work and the
//! update only lands if nobody else touched the row in the meantime.
//!
//! The store does not check that a balance stays non-negative: that is the
//! orchestrator's job, done before calling [`apply_delta`].

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, SqlErr, entity::prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A user account holding a coin balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: i64,
    /// Unique display name, used to resolve transfer counterparties.
    pub username: String,
    pub balance: i64,
    /// Optimistic concurrency counter, bumped by every balance update.
    pub version: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub user_id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub balance: i64,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventory,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            username: model.username,
            balance: model.balance,
            version: model.version,
        }
    }
}

/// Look an account up by id.
pub async fn get_by_id<C: ConnectionTrait>(db: &C, user_id: i64) -> ResultEngine<Option<Account>> {
    Ok(Entity::find_by_id(user_id).one(db).await?.map(Account::from))
}

/// Look an account up by its username.
pub async fn get_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> ResultEngine<Option<Account>> {
    Ok(Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await?
        .map(Account::from))
}

/// Look up several accounts at once, ordered by id.
pub async fn get_many<C: ConnectionTrait>(db: &C, user_ids: &[i64]) -> ResultEngine<Vec<Account>> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(Entity::find()
        .filter(Column::UserId.is_in(user_ids.iter().copied()))
        .order_by_asc(Column::UserId)
        .all(db)
        .await?
        .into_iter()
        .map(Account::from)
        .collect())
}

/// Create a new account with the given starting balance.
///
/// A username already taken, even by a registration committed after the
/// caller's own lookup, is reported as [`EngineError::ExistingAccount`].
pub async fn insert<C: ConnectionTrait>(
    db: &C,
    username: &str,
    balance: i64,
) -> ResultEngine<Account> {
    if balance < 0 {
        return Err(EngineError::InvalidAmount(
            "starting balance must be >= 0".to_string(),
        ));
    }
    let model = ActiveModel {
        user_id: ActiveValue::NotSet,
        username: ActiveValue::Set(username.to_string()),
        balance: ActiveValue::Set(balance),
        version: ActiveValue::Set(0),
    }
    .insert(db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            EngineError::ExistingAccount(username.to_string())
        }
        _ => EngineError::Database(err),
    })?;
    Ok(model.into())
}

/// Add `delta` (possibly negative) to the balance of `account`.
///
/// The update is conditional on the row still carrying `account.version`; if
/// another unit of work updated the row first, nothing is written and
/// [`EngineError::Conflict`] is returned. On success the returned account
/// carries the new balance and version.
pub async fn apply_delta<C: ConnectionTrait>(
    db: &C,
    account: &Account,
    delta: i64,
) -> ResultEngine<Account> {
    let result = Entity::update_many()
        .col_expr(Column::Balance, Expr::col(Column::Balance).add(delta))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::UserId.eq(account.user_id))
        .filter(Column::Version.eq(account.version))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        return Err(EngineError::Conflict(format!(
            "account {} was modified concurrently",
            account.user_id
        )));
    }

    Ok(Account {
        balance: account.balance + delta,
        version: account.version + 1,
        ..account.clone()
    })
}
