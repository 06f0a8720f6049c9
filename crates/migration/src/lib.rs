pub use sea_orm_migration::prelude::*;

pub use m20250210_000001_catalog::CATALOG;

mod m20250210_000000_init;
mod m20250210_000001_catalog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250210_000000_init::Migration),
            Box::new(m20250210_000001_catalog::Migration),
        ]
    }
}
