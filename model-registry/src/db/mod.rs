//! SQLite connection setup and schema migrations.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use rusqlite::Connection;
use tracing::info;

use self::{
    manager::{LinearMigrationManager, MigrationManager},
    migration::{V0, V1},
    tables::DB,
};

pub mod manager;
pub mod migration;
pub mod tables;

/// Every migration the registry knows about, in order.
pub fn migrations() -> LinearMigrationManager {
    let mut manager = LinearMigrationManager::new();
    manager.register_migration(Arc::new(V0));
    manager.register_migration(Arc::new(V1));
    manager
}

/// Bring the schema of `conn` up to the latest version in a single transaction.
pub fn migrate(conn: &mut Connection) -> anyhow::Result<()> {
    let manager = migrations();
    let txn = conn.transaction()?;
    manager.initialize(&txn)?;

    let current = manager.get_current_schema_version(&txn)?;
    let target = manager.get_target_schema_version();
    manager.upgrade_schema(&txn, current, target)?;

    txn.commit().context("failed to commit schema migration")?;
    info!(from = current, to = target, "schema ready");
    Ok(())
}

/// Open (or create) the database at `path` and migrate it.
pub fn open<T: AsRef<Path>>(path: T) -> anyhow::Result<Connection> {
    let mut conn = DB::open(path)?;
    migrate(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let mut conn = DB::open_in_memory()?;
    migrate(&mut conn)?;
    Ok(conn)
}
