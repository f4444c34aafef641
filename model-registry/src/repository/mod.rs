//! Persistence contract for the catalog.
//!
//! Implementations own consistency: duplicate detection on create, atomic metadata replacement and
//! race-free tag get-or-create all happen behind this trait, never in the service layer.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    entity::{Metadata, Model, ModelFramework, ModelStatus, ModelVersion},
    error::Result,
};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryModelRepository;
pub use sqlite::SqliteModelRepository;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Persist a new model, assigning an id if it has none.
    ///
    /// Fails with `Duplicate` if an active model already uses the same name and version.
    async fn create(&self, model: Model) -> Result<Model>;

    async fn get_by_id(&self, id: Uuid) -> Result<Model>;

    async fn get_by_name_and_version(&self, name: &str, version: &str) -> Result<Model>;

    async fn list(&self, filter: &ModelFilter, pagination: Pagination) -> Result<ModelPage>;

    /// Replace the mutable columns of an active model. Status is left alone; it only moves
    /// through [ModelRepository::update_status].
    async fn update(&self, model: &Model) -> Result<()>;

    /// Soft delete. Deleting twice is `NotFound` the second time.
    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn update_status(&self, id: Uuid, status: ModelStatus) -> Result<()>;

    /// Associate tags, creating vocabulary entries on first use. Idempotent.
    async fn add_tags(&self, model_id: Uuid, names: &[String]) -> Result<()>;

    /// Disassociate tags from one model. Vocabulary entries are kept.
    async fn remove_tags(&self, model_id: Uuid, names: &[String]) -> Result<()>;

    /// Replace the whole metadata set in one atomic step.
    async fn set_metadata(&self, model_id: Uuid, metadata: &Metadata) -> Result<()>;

    async fn get_metadata(&self, model_id: Uuid) -> Result<Metadata>;

    /// Append a version record. Labels are unique per model.
    async fn add_version(&self, version: ModelVersion) -> Result<ModelVersion>;

    /// Version history of an active model, oldest first.
    async fn list_versions(&self, model_id: Uuid) -> Result<Vec<ModelVersion>>;
}

/// Listing predicates. Every populated field must match; `tags` matches when the model carries
/// at least one of the listed tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFilter {
    /// Substring of the model name.
    pub name: Option<String>,
    pub framework: Option<ModelFramework>,
    pub status: Option<ModelStatus>,
    pub owner_id: Option<String>,
    pub tenant_id: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Vec<String>,
}

impl ModelFilter {
    pub fn matches(&self, model: &Model) -> bool {
        self.name
            .as_deref()
            .map_or(true, |name| model.name.contains(name))
            && self.framework.map_or(true, |f| model.framework == f)
            && self.status.map_or(true, |s| model.status == s)
            && self
                .owner_id
                .as_deref()
                .map_or(true, |owner| model.owner_id == owner)
            && self
                .tenant_id
                .as_deref()
                .map_or(true, |tenant| model.tenant_id == tenant)
            && self.is_public.map_or(true, |p| model.is_public == p)
            && (self.tags.is_empty() || model.tags.iter().any(|t| self.tags.contains(t)))
    }
}

/// Requested page window, as received from a caller. Values are coerced by [Pagination::window].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Page numbers below 1 become 1; limits outside `1..=100` become 20.
    pub fn window(&self) -> PageWindow {
        let page = match self.page {
            Some(page) if page >= 1 => u32::try_from(page).unwrap_or(u32::MAX),
            _ => 1,
        };
        let limit = match self.limit {
            Some(limit) if (1..=MAX_PAGE_LIMIT as i64).contains(&limit) => limit as u32,
            _ => DEFAULT_PAGE_LIMIT,
        };
        PageWindow { page, limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// One page of a listing. `total` counts the whole filtered set.
#[derive(Debug, Clone)]
pub struct ModelPage {
    pub models: Vec<Model>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{db, error::RegistryError};

    #[test]
    fn window_coercion() {
        assert_eq!(Pagination::default().window(), PageWindow { page: 1, limit: 20 });
        assert_eq!(Pagination::new(0, 0).window(), PageWindow { page: 1, limit: 20 });
        assert_eq!(Pagination::new(-4, 500).window(), PageWindow { page: 1, limit: 20 });
        assert_eq!(Pagination::new(3, 100).window(), PageWindow { page: 3, limit: 100 });
        assert_eq!(Pagination::new(2, 1).window(), PageWindow { page: 2, limit: 1 });
        assert_eq!(Pagination::new(3, 25).window().offset(), 50);
    }

    fn model(name: &str, version: &str) -> Model {
        Model::new(name, version, ModelFramework::PyTorch)
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn backends() -> Vec<Arc<dyn ModelRepository>> {
        let conn = db::open_in_memory().unwrap();
        vec![
            Arc::new(InMemoryModelRepository::new()),
            Arc::new(SqliteModelRepository::new(conn)),
        ]
    }

    #[tokio::test]
    async fn create_then_get() {
        for repo in backends() {
            let mut input = model("bert-base", "1.0.0");
            input.description = "encoder".into();
            input.owner_id = "owner-1".into();
            input.tenant_id = "tenant-1".into();
            input.is_public = true;
            input.size = 1024;
            input.checksum = "abc123".into();
            input.storage_path = "s3://models/bert".into();

            let created = repo.create(input.clone()).await.unwrap();
            assert!(!created.id.is_nil());

            let fetched = repo.get_by_id(created.id).await.unwrap();
            assert_eq!(fetched.name, input.name);
            assert_eq!(fetched.version, input.version);
            assert_eq!(fetched.description, input.description);
            assert_eq!(fetched.framework, input.framework);
            assert_eq!(fetched.status, ModelStatus::Pending);
            assert_eq!(fetched.owner_id, input.owner_id);
            assert_eq!(fetched.tenant_id, input.tenant_id);
            assert_eq!(fetched.size, 1024);
            assert_eq!(fetched.checksum, "abc123");
            assert_eq!(fetched.storage_path, "s3://models/bert");
            assert!(fetched.is_public);
            assert!(fetched.tags.is_empty());
            assert!(fetched.metadata.is_empty());

            let by_name = repo
                .get_by_name_and_version("bert-base", "1.0.0")
                .await
                .unwrap();
            assert_eq!(by_name.id, created.id);
        }
    }

    #[tokio::test]
    async fn duplicates_and_soft_delete() {
        for repo in backends() {
            let first = repo.create(model("resnet", "2")).await.unwrap();
            let err = repo.create(model("resnet", "2")).await.unwrap_err();
            assert!(matches!(err, RegistryError::Duplicate { .. }), "{err:?}");

            // Same name, other version is fine.
            repo.create(model("resnet", "3")).await.unwrap();

            repo.delete(first.id).await.unwrap();
            assert!(matches!(
                repo.get_by_id(first.id).await,
                Err(RegistryError::NotFound)
            ));
            assert!(matches!(
                repo.delete(first.id).await,
                Err(RegistryError::NotFound)
            ));

            // Deleted rows no longer reserve their name and version.
            let again = repo.create(model("resnet", "2")).await.unwrap();
            assert_ne!(again.id, first.id);
            assert_eq!(
                repo.get_by_name_and_version("resnet", "2").await.unwrap().id,
                again.id
            );
        }
    }

    #[tokio::test]
    async fn unknown_ids() {
        for repo in backends() {
            let id = Uuid::new_v4();
            assert!(matches!(repo.get_by_id(id).await, Err(RegistryError::NotFound)));
            assert!(matches!(repo.delete(id).await, Err(RegistryError::NotFound)));
            assert!(matches!(
                repo.update_status(id, ModelStatus::Ready).await,
                Err(RegistryError::NotFound)
            ));
            assert!(matches!(
                repo.add_tags(id, &tags(&["x"])).await,
                Err(RegistryError::NotFound)
            ));
            assert!(matches!(
                repo.get_metadata(id).await,
                Err(RegistryError::NotFound)
            ));
            let mut ghost = model("ghost", "1");
            ghost.id = id;
            assert!(matches!(repo.update(&ghost).await, Err(RegistryError::NotFound)));
        }
    }

    #[tokio::test]
    async fn update_replaces_mutable_fields() {
        for repo in backends() {
            let mut created = repo.create(model("gpt", "1")).await.unwrap();
            created.name = "gpt-small".into();
            created.description = "renamed".into();
            created.is_public = true;
            created.docker_image = "registry/gpt:1".into();
            repo.update(&created).await.unwrap();

            let fetched = repo.get_by_id(created.id).await.unwrap();
            assert_eq!(fetched.name, "gpt-small");
            assert_eq!(fetched.description, "renamed");
            assert!(fetched.is_public);
            assert_eq!(fetched.docker_image, "registry/gpt:1");
            assert!(fetched.updated_at >= fetched.created_at);

            // Renaming onto an existing pair is a uniqueness violation.
            repo.create(model("taken", "1")).await.unwrap();
            created.name = "taken".into();
            assert!(matches!(
                repo.update(&created).await,
                Err(RegistryError::Duplicate { .. })
            ));
        }
    }

    #[tokio::test]
    async fn update_from_a_stale_copy_keeps_status() {
        for repo in backends() {
            let mut stale = repo.create(model("whisper", "3")).await.unwrap();
            repo.update_status(stale.id, ModelStatus::Ready).await.unwrap();

            stale.description = "speech".into();
            assert_eq!(stale.status, ModelStatus::Pending);
            repo.update(&stale).await.unwrap();

            let fetched = repo.get_by_id(stale.id).await.unwrap();
            assert_eq!(fetched.description, "speech");
            assert_eq!(fetched.status, ModelStatus::Ready);
        }
    }

    #[tokio::test]
    async fn status_updates_are_unconstrained() {
        for repo in backends() {
            let created = repo.create(model("svm", "1")).await.unwrap();
            for status in [ModelStatus::Archived, ModelStatus::Pending, ModelStatus::Running] {
                repo.update_status(created.id, status).await.unwrap();
                assert_eq!(repo.get_by_id(created.id).await.unwrap().status, status);
            }
        }
    }

    #[tokio::test]
    async fn tags_are_shared_vocabulary() {
        for repo in backends() {
            let a = repo.create(model("a", "1")).await.unwrap();
            let b = repo.create(model("b", "1")).await.unwrap();

            repo.add_tags(a.id, &tags(&["nlp", "vision"])).await.unwrap();
            repo.add_tags(a.id, &tags(&["nlp"])).await.unwrap();
            repo.add_tags(b.id, &tags(&["nlp"])).await.unwrap();
            assert_eq!(repo.get_by_id(a.id).await.unwrap().tags, tags(&["nlp", "vision"]));

            repo.remove_tags(a.id, &tags(&["nlp", "unknown"])).await.unwrap();
            assert_eq!(repo.get_by_id(a.id).await.unwrap().tags, tags(&["vision"]));
            assert_eq!(repo.get_by_id(b.id).await.unwrap().tags, tags(&["nlp"]));

            // The vocabulary entry survives losing its last reference.
            repo.remove_tags(b.id, &tags(&["nlp"])).await.unwrap();
            repo.add_tags(a.id, &tags(&["nlp"])).await.unwrap();
            assert_eq!(repo.get_by_id(a.id).await.unwrap().tags, tags(&["nlp", "vision"]));
        }
    }

    #[tokio::test]
    async fn metadata_is_replaced_not_merged() {
        for repo in backends() {
            let created = repo.create(model("m", "1")).await.unwrap();
            assert!(repo.get_metadata(created.id).await.unwrap().is_empty());

            let first = Metadata::from([
                ("accuracy".to_string(), "0.91".to_string()),
                ("dataset".to_string(), "imagenet".to_string()),
            ]);
            repo.set_metadata(created.id, &first).await.unwrap();
            assert_eq!(repo.get_metadata(created.id).await.unwrap(), first);

            let second = Metadata::from([("license".to_string(), "mit".to_string())]);
            repo.set_metadata(created.id, &second).await.unwrap();
            assert_eq!(repo.get_metadata(created.id).await.unwrap(), second);
            assert_eq!(repo.get_by_id(created.id).await.unwrap().metadata, second);

            repo.set_metadata(created.id, &Metadata::new()).await.unwrap();
            assert!(repo.get_metadata(created.id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn list_filters_and_pagination() {
        for repo in backends() {
            let mut ids = Vec::new();
            for (name, framework, owner) in [
                ("bert-base", ModelFramework::PyTorch, "alice"),
                ("bert-large", ModelFramework::PyTorch, "bob"),
                ("resnet", ModelFramework::Onnx, "alice"),
                ("distilbert", ModelFramework::PyTorch, "alice"),
            ] {
                let mut m = Model::new(name, "1", framework);
                m.owner_id = owner.into();
                ids.push(repo.create(m).await.unwrap().id);
            }
            repo.add_tags(ids[0], &tags(&["nlp"])).await.unwrap();
            repo.add_tags(ids[2], &tags(&["vision"])).await.unwrap();
            repo.update_status(ids[3], ModelStatus::Ready).await.unwrap();
            repo.delete(ids[1]).await.unwrap();

            let all = repo
                .list(&ModelFilter::default(), Pagination::default())
                .await
                .unwrap();
            assert_eq!(all.total, 3);
            // Newest first.
            let listed: Vec<Uuid> = all.models.iter().map(|m| m.id).collect();
            assert_eq!(listed, vec![ids[3], ids[2], ids[0]]);

            let bert = ModelFilter {
                name: Some("bert".into()),
                ..Default::default()
            };
            let page = repo.list(&bert, Pagination::new(1, 1)).await.unwrap();
            assert_eq!(page.total, 2);
            assert_eq!(page.models.len(), 1);
            assert_eq!(page.models[0].id, ids[3]);
            let page = repo.list(&bert, Pagination::new(2, 1)).await.unwrap();
            assert_eq!(page.models[0].id, ids[0]);
            let page = repo.list(&bert, Pagination::new(3, 1)).await.unwrap();
            assert!(page.models.is_empty());
            assert_eq!(page.total, 2);

            let tagged = ModelFilter {
                tags: tags(&["nlp", "vision", "audio"]),
                ..Default::default()
            };
            let page = repo.list(&tagged, Pagination::default()).await.unwrap();
            assert_eq!(page.total, 2);

            let narrowed = ModelFilter {
                tags: tags(&["nlp", "vision"]),
                owner_id: Some("alice".into()),
                framework: Some(ModelFramework::Onnx),
                ..Default::default()
            };
            let page = repo.list(&narrowed, Pagination::default()).await.unwrap();
            assert_eq!(page.total, 1);
            assert_eq!(page.models[0].id, ids[2]);

            let ready = ModelFilter {
                status: Some(ModelStatus::Ready),
                is_public: Some(false),
                ..Default::default()
            };
            let page = repo.list(&ready, Pagination::new(0, 500)).await.unwrap();
            assert_eq!(page.total, 1);
            assert_eq!((page.page, page.limit), (1, 20));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_creates_of_one_pair() {
        for repo in backends() {
            let spawn_create = |repo: Arc<dyn ModelRepository>| {
                tokio::spawn(async move { repo.create(model("race", "1.0")).await })
            };
            let a = spawn_create(repo.clone());
            let b = spawn_create(repo.clone());
            let outcomes = [a.await.unwrap(), b.await.unwrap()];
            assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(outcomes
                .iter()
                .any(|r| matches!(r, Err(RegistryError::Duplicate { .. }))));
        }
    }

    #[tokio::test]
    async fn concurrent_first_use_of_a_tag() {
        for repo in backends() {
            let a = repo.create(model("a", "1")).await.unwrap();
            let b = repo.create(model("b", "1")).await.unwrap();
            let shared = tags(&["fresh"]);
            let (ra, rb) = tokio::join!(repo.add_tags(a.id, &shared), repo.add_tags(b.id, &shared));
            ra.unwrap();
            rb.unwrap();

            let filter = ModelFilter {
                tags: shared.clone(),
                ..Default::default()
            };
            assert_eq!(repo.list(&filter, Pagination::default()).await.unwrap().total, 2);
        }
    }

    #[tokio::test]
    async fn version_history() {
        for repo in backends() {
            let created = repo.create(model("llama", "1")).await.unwrap();
            let record = |label: &str| ModelVersion {
                id: Uuid::nil(),
                model_id: created.id,
                version: label.into(),
                status: ModelStatus::Ready,
                size: 7,
                checksum: "c".into(),
                storage_path: "p".into(),
                docker_image: String::new(),
                change_log: format!("release {label}"),
                created_by: "alice".into(),
                created_at: time::OffsetDateTime::now_utc(),
            };

            let v1 = repo.add_version(record("v1")).await.unwrap();
            assert!(!v1.id.is_nil());
            repo.add_version(record("v2")).await.unwrap();
            assert!(matches!(
                repo.add_version(record("v1")).await,
                Err(RegistryError::DuplicateVersion { .. })
            ));

            let history = repo.list_versions(created.id).await.unwrap();
            let labels: Vec<&str> = history.iter().map(|v| v.version.as_str()).collect();
            assert_eq!(labels, vec!["v1", "v2"]);
            assert_eq!(history[0].change_log, "release v1");

            let mut orphan = record("v1");
            orphan.model_id = Uuid::new_v4();
            assert!(matches!(
                repo.add_version(orphan).await,
                Err(RegistryError::NotFound)
            ));
        }
    }
}
