use rusqlite::Transaction;

use super::tables::{ROOT_SCHEMA, VERSION_SCHEMA};

/// A forward-only schema change.
pub trait Migration: Send + Sync {
    fn forward(&self, txn: &Transaction) -> anyhow::Result<()>;
}

/// Models, the tag vocabulary, tag associations and metadata.
pub struct V0;

impl Migration for V0 {
    fn forward(&self, txn: &Transaction) -> anyhow::Result<()> {
        txn.execute_batch(ROOT_SCHEMA)?;
        Ok(())
    }
}

/// Append-only version history.
pub struct V1;

impl Migration for V1 {
    fn forward(&self, txn: &Transaction) -> anyhow::Result<()> {
        txn.execute_batch(VERSION_SCHEMA)?;
        Ok(())
    }
}
