//! Package for MigrationManager, which depends on a set of `Migration`s

use std::sync::Arc;

use anyhow::Context;
use rusqlite::{OptionalExtension, Transaction};
use tracing::info;

use super::migration::Migration;

pub trait MigrationManager<'a> {
    fn register_migration(&mut self, migration: Arc<dyn Migration>);

    /// Initialize the migration system in the database
    fn initialize(&self, conn: &'a Transaction) -> anyhow::Result<()>;

    /// Get the current schema version number from the DB, 0 if nothing was ever applied
    fn get_current_schema_version(&self, conn: &'a Transaction) -> anyhow::Result<u64>;

    fn get_target_schema_version(&self) -> u64;

    fn upgrade_schema(&self, conn: &'a Transaction, from: u64, to: u64) -> anyhow::Result<()>;
}

/// Applies migrations in registration order. Schema version `n` means the first `n` migrations
/// have run.
#[derive(Default)]
pub struct LinearMigrationManager {
    pub migrations: Vec<Arc<dyn Migration>>,
}

impl LinearMigrationManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> MigrationManager<'a> for LinearMigrationManager {
    fn register_migration(&mut self, migration: Arc<dyn Migration>) {
        self.migrations.push(migration);
    }

    fn initialize(&self, conn: &'a Transaction) -> anyhow::Result<()> {
        conn.execute_batch(
            r"
            create table if not exists schema_versions (
                version INTEGER NOT NULL,
                is_current INTEGER NOT NULL,
                PRIMARY KEY (version)
            );
        ",
        )?;

        Ok(())
    }

    fn get_current_schema_version(&self, conn: &'a Transaction) -> anyhow::Result<u64> {
        let version = conn
            .query_row(
                "select version from schema_versions where is_current = 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .context("failed to read schema version")?;

        match version {
            None => Ok(0),
            Some(v) => u64::try_from(v).context("negative schema version"),
        }
    }

    fn get_target_schema_version(&self) -> u64 {
        self.migrations.len() as u64
    }

    fn upgrade_schema(&self, conn: &'a Transaction, from: u64, to: u64) -> anyhow::Result<()> {
        if from > self.get_target_schema_version() || to > self.get_target_schema_version() {
            return Err(MigrationError::InvalidSchemaVersion.into());
        }

        if to < from {
            return Err(MigrationError::InvalidSchemaRange.into());
        }

        if from == to {
            return Ok(());
        }

        info!(from, to, "executing schema upgrade");
        for i in from..to {
            let migration = &self.migrations[i as usize];
            info!(migration = i, "starting migration");
            migration.forward(conn)?;
            conn.execute("update schema_versions set is_current = 0", [])?;
            conn.execute(
                "insert into schema_versions (version, is_current) values (?1, 1)",
                [(i + 1) as i64],
            )?;
            info!(migration = i, "migration complete");
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("schema version is beyond the registered migrations")]
    InvalidSchemaVersion,
    #[error("schema downgrades are not supported")]
    InvalidSchemaRange,
}
