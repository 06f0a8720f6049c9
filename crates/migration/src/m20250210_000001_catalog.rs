//! Seeds the store catalog.

use sea_orm_migration::prelude::*;

use crate::m20250210_000000_init::Items;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// `(name, price)` of every item sold by the store.
pub const CATALOG: [(&str, i64); 10] = [
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut stmt = Query::insert()
            .into_table(Items::Table)
            .columns([Items::Name, Items::Price])
            .to_owned();
        for (name, price) in CATALOG {
            stmt.values_panic([name.into(), price.into()]);
        }

        manager.exec_stmt(stmt).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let stmt = Query::delete()
            .from_table(Items::Table)
            .and_where(Expr::col(Items::Name).is_in(CATALOG.map(|(name, _)| name)))
            .to_owned();

        manager.exec_stmt(stmt).await?;
        Ok(())
    }
}
