pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_table;
mod m20251001_000002_create_table;
mod m20251001_000003_create_table;
mod m20251001_000004_create_index;
mod m20251001_000005_create_constraint;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_table::Migration),
            Box::new(m20251001_000002_create_table::Migration),
            Box::new(m20251001_000003_create_table::Migration),
            Box::new(m20251001_000004_create_index::Migration),
            Box::new(m20251001_000005_create_constraint::Migration),
        ]
    }
}
