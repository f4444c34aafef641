use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{
    params, params_from_iter, types::Value, Connection, ErrorCode, OptionalExtension, Row,
};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ModelFilter, ModelPage, ModelRepository, Pagination};
use crate::{
    entity::{Metadata, Model, ModelStatus, ModelVersion},
    error::{RegistryError, Result},
};

const MODEL_COLUMNS: &str = "m.id, m.name, m.description, m.version, m.framework, m.status, \
     m.size, m.checksum, m.storage_path, m.docker_image, m.owner_id, m.tenant_id, m.is_public, \
     m.created_at, m.updated_at, m.deleted_at";

const VERSION_COLUMNS: &str = "id, model_id, version, status, size, checksum, storage_path, \
     docker_image, change_log, created_by, created_at";

/// Repository over a single SQLite connection.
///
/// The connection sits behind an async mutex, so every operation below runs as one isolated unit:
/// the duplicate check and insert in `create`, the clear and refill in `set_metadata`, and the
/// tag get-or-create in `add_tags` can never interleave with another request.
pub struct SqliteModelRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteModelRepository {
    /// `conn` must already be migrated, see [crate::db::open].
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = Arc::clone(&self.conn).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *conn))
            .await
            .map_err(|err| RegistryError::Internal(anyhow::Error::new(err).context("storage task failed")))?
    }
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn size_to_sql(size: u64) -> Result<i64> {
    i64::try_from(size).map_err(|_| RegistryError::invalid("size does not fit in a signed 64-bit integer"))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion(idx, e))
}

fn size_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    u64::try_from(row.get::<_, i64>(idx)?).map_err(|e| conversion(idx, e))
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<Model> {
    Ok(Model {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        version: row.get(3)?,
        framework: row.get::<_, String>(4)?.parse().map_err(|e| conversion(4, e))?,
        status: row.get::<_, String>(5)?.parse().map_err(|e| conversion(5, e))?,
        size: size_at(row, 6)?,
        checksum: row.get(7)?,
        storage_path: row.get(8)?,
        docker_image: row.get(9)?,
        tags: Vec::new(),
        metadata: Metadata::new(),
        owner_id: row.get(10)?,
        tenant_id: row.get(11)?,
        is_public: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        lifecycle: row.get::<_, Option<OffsetDateTime>>(15)?.into(),
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<ModelVersion> {
    Ok(ModelVersion {
        id: uuid_at(row, 0)?,
        model_id: uuid_at(row, 1)?,
        version: row.get(2)?,
        status: row.get::<_, String>(3)?.parse().map_err(|e| conversion(3, e))?,
        size: size_at(row, 4)?,
        checksum: row.get(5)?,
        storage_path: row.get(6)?,
        docker_image: row.get(7)?,
        change_log: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn ensure_active(conn: &Connection, id: &str) -> Result<()> {
    conn.query_row(
        "select 1 from model where id = ?1 and deleted_at is null",
        [id],
        |_| Ok(()),
    )
    .optional()?
    .ok_or(RegistryError::NotFound)
}

fn load_tags(conn: &Connection, model_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "select t.name from model_tag mt join tag t on t.id = mt.tag_id
         where mt.model_id = ?1 order by t.name",
    )?;
    let names = stmt.query_map([model_id], |row| row.get(0))?;
    names.collect()
}

fn load_metadata(conn: &Connection, model_id: &str) -> rusqlite::Result<Metadata> {
    let mut stmt =
        conn.prepare_cached("select key, value from model_metadata where model_id = ?1")?;
    let entries = stmt.query_map([model_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    entries.collect()
}

fn hydrate(conn: &Connection, mut model: Model) -> Result<Model> {
    let id = model.id.to_string();
    model.tags = load_tags(conn, &id)?;
    model.metadata = load_metadata(conn, &id)?;
    Ok(model)
}

fn fetch_one(conn: &Connection, predicate: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Model> {
    let sql = format!("select {MODEL_COLUMNS} from model m where {predicate} and m.deleted_at is null");
    let model = conn
        .query_row(&sql, args, model_from_row)
        .optional()?
        .ok_or(RegistryError::NotFound)?;
    hydrate(conn, model)
}

/// SQL predicate and its positional arguments for a listing filter.
fn filter_clause(filter: &ModelFilter) -> (String, Vec<Value>) {
    let mut sql = String::from("m.deleted_at is null");
    let mut args = Vec::new();

    if let Some(name) = &filter.name {
        // instr keeps the match case-sensitive, unlike like.
        sql.push_str(" and instr(m.name, ?) > 0");
        args.push(Value::Text(name.clone()));
    }
    if let Some(framework) = filter.framework {
        sql.push_str(" and m.framework = ?");
        args.push(Value::Text(framework.as_str().to_string()));
    }
    if let Some(status) = filter.status {
        sql.push_str(" and m.status = ?");
        args.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(owner) = &filter.owner_id {
        sql.push_str(" and m.owner_id = ?");
        args.push(Value::Text(owner.clone()));
    }
    if let Some(tenant) = &filter.tenant_id {
        sql.push_str(" and m.tenant_id = ?");
        args.push(Value::Text(tenant.clone()));
    }
    if let Some(is_public) = filter.is_public {
        sql.push_str(" and m.is_public = ?");
        args.push(Value::Integer(is_public as i64));
    }
    if !filter.tags.is_empty() {
        let placeholders = vec!["?"; filter.tags.len()].join(", ");
        sql.push_str(&format!(
            " and exists (select 1 from model_tag mt join tag t on t.id = mt.tag_id \
             where mt.model_id = m.id and t.name in ({placeholders}))"
        ));
        args.extend(filter.tags.iter().cloned().map(Value::Text));
    }

    (sql, args)
}

#[async_trait]
impl ModelRepository for SqliteModelRepository {
    async fn create(&self, mut model: Model) -> Result<Model> {
        self.with_conn(move |conn| {
            if model.id.is_nil() {
                model.id = Uuid::new_v4();
            }
            let size = size_to_sql(model.size)?;
            let now = OffsetDateTime::now_utc();
            model.created_at = now;
            model.updated_at = now;
            model.tags.clear();
            model.metadata.clear();

            let txn = conn.transaction()?;
            let taken = txn
                .query_row(
                    "select 1 from model where name = ?1 and version = ?2 and deleted_at is null",
                    [&model.name, &model.version],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            let duplicate = || RegistryError::Duplicate {
                name: model.name.clone(),
                version: model.version.clone(),
            };
            if taken {
                return Err(duplicate());
            }

            txn.execute(
                "insert into model (id, name, description, version, framework, status, size,
                     checksum, storage_path, docker_image, owner_id, tenant_id, is_public,
                     created_at, updated_at, deleted_at)
                 values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, null)",
                params![
                    model.id.to_string(),
                    model.name,
                    model.description,
                    model.version,
                    model.framework.as_str(),
                    model.status.as_str(),
                    size,
                    model.checksum,
                    model.storage_path,
                    model.docker_image,
                    model.owner_id,
                    model.tenant_id,
                    model.is_public,
                    model.created_at,
                    model.updated_at,
                ],
            )
            .map_err(|err| {
                if is_constraint_violation(&err) {
                    duplicate()
                } else {
                    err.into()
                }
            })?;
            txn.commit()?;
            Ok(model)
        })
        .await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Model> {
        self.with_conn(move |conn| fetch_one(conn, "m.id = ?1", &[&id.to_string()]))
            .await
    }

    async fn get_by_name_and_version(&self, name: &str, version: &str) -> Result<Model> {
        let (name, version) = (name.to_string(), version.to_string());
        self.with_conn(move |conn| {
            fetch_one(conn, "m.name = ?1 and m.version = ?2", &[&name, &version])
        })
        .await
    }

    async fn list(&self, filter: &ModelFilter, pagination: Pagination) -> Result<ModelPage> {
        let window = pagination.window();
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let (predicate, mut args) = filter_clause(&filter);

            let total: i64 = conn.query_row(
                &format!("select count(*) from model m where {predicate}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )?;

            args.push(Value::Integer(window.limit as i64));
            args.push(Value::Integer(window.offset() as i64));
            let mut stmt = conn.prepare(&format!(
                "select {MODEL_COLUMNS} from model m where {predicate}
                 order by m.created_at desc, m.seq desc limit ? offset ?"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), model_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let models = rows
                .into_iter()
                .map(|model| hydrate(conn, model))
                .collect::<Result<Vec<_>>>()?;

            Ok(ModelPage {
                models,
                total: total as u64,
                page: window.page,
                limit: window.limit,
            })
        })
        .await
    }

    async fn update(&self, model: &Model) -> Result<()> {
        let model = model.clone();
        self.with_conn(move |conn| {
            let size = size_to_sql(model.size)?;
            let affected = conn
                .execute(
                    "update model set name = ?1, description = ?2, size = ?3,
                         checksum = ?4, storage_path = ?5, docker_image = ?6, is_public = ?7,
                         updated_at = ?8
                     where id = ?9 and deleted_at is null",
                    params![
                        model.name,
                        model.description,
                        size,
                        model.checksum,
                        model.storage_path,
                        model.docker_image,
                        model.is_public,
                        OffsetDateTime::now_utc(),
                        model.id.to_string(),
                    ],
                )
                .map_err(|err| {
                    if is_constraint_violation(&err) {
                        RegistryError::Duplicate {
                            name: model.name.clone(),
                            version: model.version.clone(),
                        }
                    } else {
                        err.into()
                    }
                })?;

            match affected {
                0 => Err(RegistryError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.with_conn(move |conn| {
            let affected = conn.execute(
                "update model set deleted_at = ?1, updated_at = ?1
                 where id = ?2 and deleted_at is null",
                params![OffsetDateTime::now_utc(), id.to_string()],
            )?;
            match affected {
                0 => Err(RegistryError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn update_status(&self, id: Uuid, status: ModelStatus) -> Result<()> {
        self.with_conn(move |conn| {
            let affected = conn.execute(
                "update model set status = ?1, updated_at = ?2
                 where id = ?3 and deleted_at is null",
                params![status.as_str(), OffsetDateTime::now_utc(), id.to_string()],
            )?;
            match affected {
                0 => Err(RegistryError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn add_tags(&self, model_id: Uuid, names: &[String]) -> Result<()> {
        let names = names.to_vec();
        self.with_conn(move |conn| {
            let model_id = model_id.to_string();
            let txn = conn.transaction()?;
            ensure_active(&txn, &model_id)?;

            let now = OffsetDateTime::now_utc();
            for name in &names {
                // The unique index on tag.name turns a concurrent first use into a no-op.
                txn.execute(
                    "insert or ignore into tag (id, name, created_at) values (?1, ?2, ?3)",
                    params![Uuid::new_v4().to_string(), name, now],
                )?;
                let tag_id: String =
                    txn.query_row("select id from tag where name = ?1", [name], |row| row.get(0))?;
                txn.execute(
                    "insert or ignore into model_tag (model_id, tag_id) values (?1, ?2)",
                    [&model_id, &tag_id],
                )?;
            }

            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove_tags(&self, model_id: Uuid, names: &[String]) -> Result<()> {
        let names = names.to_vec();
        self.with_conn(move |conn| {
            let model_id = model_id.to_string();
            let txn = conn.transaction()?;
            ensure_active(&txn, &model_id)?;

            for name in &names {
                txn.execute(
                    "delete from model_tag
                     where model_id = ?1 and tag_id in (select id from tag where name = ?2)",
                    [&model_id, name],
                )?;
            }

            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn set_metadata(&self, model_id: Uuid, metadata: &Metadata) -> Result<()> {
        let metadata = metadata.clone();
        self.with_conn(move |conn| {
            let model_id = model_id.to_string();
            let txn = conn.transaction()?;
            ensure_active(&txn, &model_id)?;

            txn.execute("delete from model_metadata where model_id = ?1", [&model_id])?;
            let now = OffsetDateTime::now_utc();
            {
                let mut insert = txn.prepare(
                    "insert into model_metadata (model_id, key, value, created_at, updated_at)
                     values (?1, ?2, ?3, ?4, ?4)",
                )?;
                for (key, value) in &metadata {
                    insert.execute(params![model_id, key, value, now])?;
                }
            }

            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_metadata(&self, model_id: Uuid) -> Result<Metadata> {
        self.with_conn(move |conn| {
            let model_id = model_id.to_string();
            ensure_active(conn, &model_id)?;
            Ok(load_metadata(conn, &model_id)?)
        })
        .await
    }

    async fn add_version(&self, mut version: ModelVersion) -> Result<ModelVersion> {
        self.with_conn(move |conn| {
            if version.id.is_nil() {
                version.id = Uuid::new_v4();
            }
            version.created_at = OffsetDateTime::now_utc();
            let size = size_to_sql(version.size)?;

            let txn = conn.transaction()?;
            ensure_active(&txn, &version.model_id.to_string())?;
            txn.execute(
                "insert into model_version (id, model_id, version, status, size, checksum,
                     storage_path, docker_image, change_log, created_by, created_at)
                 values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    version.id.to_string(),
                    version.model_id.to_string(),
                    version.version,
                    version.status.as_str(),
                    size,
                    version.checksum,
                    version.storage_path,
                    version.docker_image,
                    version.change_log,
                    version.created_by,
                    version.created_at,
                ],
            )
            .map_err(|err| {
                if is_constraint_violation(&err) {
                    RegistryError::DuplicateVersion {
                        model_id: version.model_id,
                        version: version.version.clone(),
                    }
                } else {
                    err.into()
                }
            })?;
            txn.commit()?;
            Ok(version)
        })
        .await
    }

    async fn list_versions(&self, model_id: Uuid) -> Result<Vec<ModelVersion>> {
        self.with_conn(move |conn| {
            let model_id = model_id.to_string();
            ensure_active(conn, &model_id)?;
            let mut stmt = conn.prepare(&format!(
                "select {VERSION_COLUMNS} from model_version where model_id = ?1 order by seq"
            ))?;
            let versions = stmt
                .query_map([&model_id], version_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(versions)
        })
        .await
    }
}
