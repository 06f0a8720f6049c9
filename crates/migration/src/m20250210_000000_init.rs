//! Initial schema migration.
//!
//! - `accounts`: coin balance per user, with an optimistic `version` counter
//! - `items`: the store catalog
//! - `inventory`: items owned per user, one row per `(user_id, item_id)`
//! - `ledger`: append-only log of transfers and purchases

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    UserId,
    Username,
    Balance,
    Version,
}

#[derive(Iden)]
pub(crate) enum Items {
    Table,
    Id,
    Name,
    Price,
}

#[derive(Iden)]
enum Inventory {
    Table,
    UserId,
    ItemId,
    Quantity,
}

#[derive(Iden)]
enum Ledger {
    Table,
    Id,
    SenderId,
    ReceiverKind,
    ReceiverId,
    Amount,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::UserId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::Balance).big_integer().not_null())
                    .col(
                        ColumnDef::new(Accounts::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Items::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Items::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Items::Price).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Inventory
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Inventory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Inventory::UserId).integer().not_null())
                    .col(ColumnDef::new(Inventory::ItemId).integer().not_null())
                    .col(ColumnDef::new(Inventory::Quantity).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(Inventory::UserId)
                            .col(Inventory::ItemId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory-user_id")
                            .from(Inventory::Table, Inventory::UserId)
                            .to(Accounts::Table, Accounts::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory-item_id")
                            .from(Inventory::Table, Inventory::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Ledger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ledger::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ledger::SenderId).integer().not_null())
                    .col(ColumnDef::new(Ledger::ReceiverKind).string().not_null())
                    .col(ColumnDef::new(Ledger::ReceiverId).integer())
                    .col(ColumnDef::new(Ledger::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Ledger::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger-sender_id")
                            .from(Ledger::Table, Ledger::SenderId)
                            .to(Accounts::Table, Accounts::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger-receiver_id")
                            .from(Ledger::Table, Ledger::ReceiverId)
                            .to(Accounts::Table, Accounts::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger-sender_id")
                    .table(Ledger::Table)
                    .col(Ledger::SenderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger-receiver_id")
                    .table(Ledger::Table)
                    .col(Ledger::ReceiverId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Ledger::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
