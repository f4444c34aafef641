use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ModelFilter, ModelPage, ModelRepository, Pagination};
use crate::{
    entity::{Metadata, MetadataEntry, Model, ModelStatus, ModelVersion, Tag},
    error::{RegistryError, Result},
};

#[derive(Debug)]
struct Row {
    /// Insertion sequence, used to break ties between identical creation times.
    seq: u64,
    model: Model,
    tag_ids: BTreeSet<Uuid>,
    metadata: Vec<MetadataEntry>,
    versions: Vec<ModelVersion>,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    rows: HashMap<Uuid, Row>,
    /// Tag vocabulary keyed by name.
    tags: BTreeMap<String, Tag>,
}

impl State {
    fn active(&self, id: Uuid) -> Result<&Row> {
        self.rows
            .get(&id)
            .filter(|row| row.model.lifecycle.is_active())
            .ok_or(RegistryError::NotFound)
    }

    fn active_mut(&mut self, id: Uuid) -> Result<&mut Row> {
        self.rows
            .get_mut(&id)
            .filter(|row| row.model.lifecycle.is_active())
            .ok_or(RegistryError::NotFound)
    }

    fn name_taken(&self, name: &str, version: &str, except: Uuid) -> bool {
        self.rows.values().any(|row| {
            row.model.id != except
                && row.model.lifecycle.is_active()
                && row.model.name == name
                && row.model.version == version
        })
    }

    /// Materialize a row with its tags and metadata attached.
    fn hydrate(&self, row: &Row) -> Model {
        let mut model = row.model.clone();
        let mut tags: Vec<String> = self
            .tags
            .values()
            .filter(|tag| row.tag_ids.contains(&tag.id))
            .map(|tag| tag.name.clone())
            .collect();
        tags.sort();
        model.tags = tags;
        model.metadata = row
            .metadata
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect();
        model
    }
}

/// Process-local repository. Same contract as the SQLite one; used by tests and embedders that
/// don't need durability.
#[derive(Debug, Default)]
pub struct InMemoryModelRepository {
    state: RwLock<State>,
}

impl InMemoryModelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    async fn create(&self, mut model: Model) -> Result<Model> {
        let mut state = self.state.write().await;
        if model.id.is_nil() {
            model.id = Uuid::new_v4();
        }
        if state.rows.contains_key(&model.id)
            || state.name_taken(&model.name, &model.version, Uuid::nil())
        {
            return Err(RegistryError::Duplicate {
                name: model.name,
                version: model.version,
            });
        }

        let now = OffsetDateTime::now_utc();
        model.created_at = now;
        model.updated_at = now;
        model.tags.clear();
        model.metadata.clear();

        let seq = state.next_seq;
        state.next_seq += 1;
        state.rows.insert(
            model.id,
            Row {
                seq,
                model: model.clone(),
                tag_ids: BTreeSet::new(),
                metadata: Vec::new(),
                versions: Vec::new(),
            },
        );
        Ok(model)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Model> {
        let state = self.state.read().await;
        let row = state.active(id)?;
        Ok(state.hydrate(row))
    }

    async fn get_by_name_and_version(&self, name: &str, version: &str) -> Result<Model> {
        let state = self.state.read().await;
        state
            .rows
            .values()
            .find(|row| {
                row.model.lifecycle.is_active()
                    && row.model.name == name
                    && row.model.version == version
            })
            .map(|row| state.hydrate(row))
            .ok_or(RegistryError::NotFound)
    }

    async fn list(&self, filter: &ModelFilter, pagination: Pagination) -> Result<ModelPage> {
        let window = pagination.window();
        let state = self.state.read().await;

        let mut matching: Vec<(OffsetDateTime, u64, Model)> = state
            .rows
            .values()
            .filter(|row| row.model.lifecycle.is_active())
            .map(|row| (row.model.created_at, row.seq, state.hydrate(row)))
            .filter(|(_, _, model)| filter.matches(model))
            .collect();
        matching.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        let total = matching.len() as u64;
        let models = matching
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit as usize)
            .map(|(_, _, model)| model)
            .collect();

        Ok(ModelPage {
            models,
            total,
            page: window.page,
            limit: window.limit,
        })
    }

    async fn update(&self, model: &Model) -> Result<()> {
        let mut state = self.state.write().await;
        state.active(model.id)?;
        if state.name_taken(&model.name, &model.version, model.id) {
            return Err(RegistryError::Duplicate {
                name: model.name.clone(),
                version: model.version.clone(),
            });
        }

        let row = state.active_mut(model.id)?;
        let stored = &mut row.model;
        stored.name = model.name.clone();
        stored.description = model.description.clone();
        stored.size = model.size;
        stored.checksum = model.checksum.clone();
        stored.storage_path = model.storage_path.clone();
        stored.docker_image = model.docker_image.clone();
        stored.is_public = model.is_public;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let row = state.active_mut(id)?;
        row.model.lifecycle = Some(OffsetDateTime::now_utc()).into();
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: ModelStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let row = state.active_mut(id)?;
        row.model.status = status;
        row.model.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn add_tags(&self, model_id: Uuid, names: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        state.active(model_id)?;

        let now = OffsetDateTime::now_utc();
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let tag = state.tags.entry(name.clone()).or_insert_with(|| Tag {
                id: Uuid::new_v4(),
                name: name.clone(),
                created_at: now,
            });
            ids.push(tag.id);
        }

        state.active_mut(model_id)?.tag_ids.extend(ids);
        Ok(())
    }

    async fn remove_tags(&self, model_id: Uuid, names: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        state.active(model_id)?;

        let ids: Vec<Uuid> = names
            .iter()
            .filter_map(|name| state.tags.get(name).map(|tag| tag.id))
            .collect();
        let row = state.active_mut(model_id)?;
        for id in ids {
            row.tag_ids.remove(&id);
        }
        Ok(())
    }

    async fn set_metadata(&self, model_id: Uuid, metadata: &Metadata) -> Result<()> {
        let mut state = self.state.write().await;
        let row = state.active_mut(model_id)?;
        let now = OffsetDateTime::now_utc();
        row.metadata = metadata
            .iter()
            .map(|(key, value)| MetadataEntry {
                model_id,
                key: key.clone(),
                value: value.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();
        Ok(())
    }

    async fn get_metadata(&self, model_id: Uuid) -> Result<Metadata> {
        let state = self.state.read().await;
        let row = state.active(model_id)?;
        Ok(row
            .metadata
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect())
    }

    async fn add_version(&self, mut version: ModelVersion) -> Result<ModelVersion> {
        let mut state = self.state.write().await;
        let row = state.active_mut(version.model_id)?;
        if row.versions.iter().any(|v| v.version == version.version) {
            return Err(RegistryError::DuplicateVersion {
                model_id: version.model_id,
                version: version.version,
            });
        }
        if version.id.is_nil() {
            version.id = Uuid::new_v4();
        }
        version.created_at = OffsetDateTime::now_utc();
        row.versions.push(version.clone());
        Ok(version)
    }

    async fn list_versions(&self, model_id: Uuid) -> Result<Vec<ModelVersion>> {
        let state = self.state.read().await;
        Ok(state.active(model_id)?.versions.clone())
    }
}
