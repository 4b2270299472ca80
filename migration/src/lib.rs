//! Database migrations for the answer bot.
//!
//! All schema changes are additive; `is_active` was introduced after the
//! baseline table and is added only when the column is missing.

pub use sea_orm_migration::prelude::*;

mod m2024_01_01_000001_create_tenants;
mod m2024_02_01_000001_add_tenant_is_active;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_01_01_000001_create_tenants::Migration),
            Box::new(m2024_02_01_000001_add_tenant_is_active::Migration),
        ]
    }
}
