//! The Inventory Store.
//!
//! One row per `(user_id, item_id)` pair. A row exists only with a quantity
//! greater than zero: it is inserted on the first purchase and incremented on
//! every following one. The engine never deletes inventory rows.

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, entity::prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Item, ResultEngine, items};

/// Quantity of one catalog item owned by one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub user_id: i64,
    pub item_id: i64,
    pub quantity: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: i64,
    pub quantity: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::UserId",
        to = "super::accounts::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Items,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for InventoryEntry {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            item_id: model.item_id,
            quantity: model.quantity,
        }
    }
}

fn ensure_positive(quantity: i64) -> ResultEngine<()> {
    if quantity <= 0 {
        return Err(EngineError::InvalidAmount(
            "quantity must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Quantity of `item_id` held by `user_id`, if the user ever bought it.
pub async fn get_quantity<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    item_id: i64,
) -> ResultEngine<Option<i64>> {
    Ok(Entity::find_by_id((user_id, item_id))
        .one(db)
        .await?
        .map(|model| model.quantity))
}

/// Insert a new inventory row.
///
/// Fails with a database error if the row already exists.
pub async fn insert<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    item_id: i64,
    quantity: i64,
) -> ResultEngine<InventoryEntry> {
    ensure_positive(quantity)?;
    let model = ActiveModel {
        user_id: ActiveValue::Set(user_id),
        item_id: ActiveValue::Set(item_id),
        quantity: ActiveValue::Set(quantity),
    }
    .insert(db)
    .await?;
    Ok(model.into())
}

/// Increase the quantity of an existing inventory row.
///
/// A missing row means it vanished after it was read in this unit of work,
/// which is reported as [`EngineError::Conflict`].
pub async fn increment<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    item_id: i64,
    quantity: i64,
) -> ResultEngine<()> {
    ensure_positive(quantity)?;
    let result = Entity::update_many()
        .col_expr(Column::Quantity, Expr::col(Column::Quantity).add(quantity))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ItemId.eq(item_id))
        .exec(db)
        .await?;
    if result.rows_affected != 1 {
        return Err(EngineError::Conflict(format!(
            "inventory row ({user_id}, {item_id}) disappeared"
        )));
    }
    Ok(())
}

/// Add `quantity` units of an item: insert the row if absent, increment it
/// otherwise.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    item_id: i64,
    quantity: i64,
) -> ResultEngine<()> {
    match get_quantity(db, user_id, item_id).await? {
        Some(_) => increment(db, user_id, item_id, quantity).await,
        None => insert(db, user_id, item_id, quantity).await.map(|_| ()),
    }
}

/// Everything a user owns, with the catalog item, ordered by item name.
pub async fn list_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> ResultEngine<Vec<(Item, i64)>> {
    let rows: Vec<(Model, Option<items::Model>)> = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .find_also_related(items::Entity)
        .order_by_asc(items::Column::Name)
        .all(db)
        .await?;

    let mut out = Vec::with_capacity(rows.len());
    for (row, item) in rows {
        let Some(item) = item else { continue };
        out.push((Item::from(item), row.quantity));
    }
    Ok(out)
}
