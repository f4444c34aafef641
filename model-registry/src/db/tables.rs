use anyhow::{Context, Result};
use std::path::Path;

use rusqlite::Connection;

/// Handle to the [database connection](rusqlite::Connection)
pub struct DB;

impl DB {
    pub fn open<T: AsRef<Path>>(db_path: T) -> Result<Connection> {
        let conn = Connection::open(db_path).context("failed to open connection")?;
        Self::configure(&conn)?;
        Ok(conn)
    }

    pub fn open_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory().context("failed to open in-memory connection")?;
        Self::configure(&conn)?;
        Ok(conn)
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch("pragma foreign_keys = on;")
            .context("failed to enable foreign keys")
    }
}

/// Catalog tables. `seq` records insertion order; `deleted_at` is the soft-delete marker and only
/// active rows take part in the (name, version) uniqueness constraint.
pub static ROOT_SCHEMA: &str = r"
        create table if not exists model (
            seq             integer primary key autoincrement,
            id              text not null unique,
            name            text not null,
            description     text not null default '',
            version         text not null,
            framework       text not null,
            status          text not null,
            size            integer not null default 0,
            checksum        text not null default '',
            storage_path    text not null default '',
            docker_image    text not null default '',
            owner_id        text not null default '',
            tenant_id       text not null default '',
            is_public       integer not null default 0,
            created_at      datetime not null,
            updated_at      datetime not null,
            deleted_at      datetime
        );

        create unique index if not exists model_active_name_version
            on model (name, version) where deleted_at is null;
        create index if not exists model_owner on model (owner_id);
        create index if not exists model_tenant on model (tenant_id);

        create table if not exists tag (
            id          text not null,
            name        text not null unique,
            created_at  datetime not null,

            primary key (id)
        );

        create table if not exists model_tag (
            model_id    text not null,
            tag_id      text not null,

            primary key (model_id, tag_id),
            foreign key (model_id) references model(id),
            foreign key (tag_id) references tag(id)
        );

        create table if not exists model_metadata (
            model_id    text not null,
            key         text not null,
            value       text not null,
            created_at  datetime not null,
            updated_at  datetime not null,

            primary key (model_id, key),
            foreign key (model_id) references model(id)
        );
";

pub static VERSION_SCHEMA: &str = r"
        create table if not exists model_version (
            seq             integer primary key autoincrement,
            id              text not null unique,
            model_id        text not null,
            version         text not null,
            status          text not null,
            size            integer not null default 0,
            checksum        text not null default '',
            storage_path    text not null default '',
            docker_image    text not null default '',
            change_log      text not null default '',
            created_by      text not null default '',
            created_at      datetime not null,

            unique (model_id, version),
            foreign key (model_id) references model(id)
        );
";
