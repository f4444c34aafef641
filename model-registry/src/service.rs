//! Business operations over a [ModelRepository].
//!
//! The service validates what the repository cannot (framework membership, tag and metadata
//! shape), sequences multi-step operations, and logs every failure through its [Telemetry]
//! handle. Status transitions are unconstrained: any status may be set from any
//! other.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    entity::{Metadata, Model, ModelFramework, ModelStatus, ModelVersion},
    error::{ErrorKind, Result},
    observe::Telemetry,
    repository::{ModelFilter, ModelPage, ModelRepository, Pagination},
    validation,
};

#[derive(Debug, Clone, Default)]
pub struct CreateModelRequest {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Validated against [ModelFramework] by the service.
    pub framework: String,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub owner_id: String,
    pub tenant_id: String,
    pub is_public: bool,
    pub size: u64,
    pub checksum: String,
    pub storage_path: String,
    pub docker_image: String,
}

/// Partial update. `None` leaves the field untouched; `Some` replaces it, including
/// `Some(vec![])` which clears every tag.
#[derive(Debug, Clone, Default)]
pub struct UpdateModelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub size: Option<u64>,
    pub checksum: Option<String>,
    pub storage_path: Option<String>,
    pub docker_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Metadata>,
}

/// Snapshot request. Artifact fields left as `None` are copied from the model.
#[derive(Debug, Clone, Default)]
pub struct RecordVersionRequest {
    pub version: String,
    pub size: Option<u64>,
    pub checksum: Option<String>,
    pub storage_path: Option<String>,
    pub docker_image: Option<String>,
    pub change_log: String,
    pub created_by: String,
}

#[async_trait]
pub trait ModelService: Send + Sync {
    async fn create_model(&self, req: CreateModelRequest) -> Result<Model>;
    async fn get_model(&self, id: Uuid) -> Result<Model>;
    async fn get_model_by_name_and_version(&self, name: &str, version: &str) -> Result<Model>;
    async fn list_models(&self, filter: ModelFilter, pagination: Pagination) -> Result<ModelPage>;
    async fn update_model(&self, id: Uuid, req: UpdateModelRequest) -> Result<Model>;
    async fn update_model_status(&self, id: Uuid, status: ModelStatus) -> Result<()>;
    async fn delete_model(&self, id: Uuid) -> Result<()>;
    async fn add_model_tags(&self, id: Uuid, tags: Vec<String>) -> Result<()>;
    async fn remove_model_tags(&self, id: Uuid, tags: Vec<String>) -> Result<()>;
    async fn set_model_metadata(&self, id: Uuid, metadata: Metadata) -> Result<()>;
    async fn get_model_metadata(&self, id: Uuid) -> Result<Metadata>;
    async fn record_model_version(&self, id: Uuid, req: RecordVersionRequest) -> Result<ModelVersion>;
    async fn list_model_versions(&self, id: Uuid) -> Result<Vec<ModelVersion>>;
}

/// Tags to add and tags to remove to move from `current` to `desired`.
pub fn tag_delta(current: &[String], desired: &[String]) -> (Vec<String>, Vec<String>) {
    let current_set: HashSet<&String> = current.iter().collect();
    let desired_set: HashSet<&String> = desired.iter().collect();

    let mut to_add = Vec::new();
    for tag in desired {
        if !current_set.contains(tag) && !to_add.contains(tag) {
            to_add.push(tag.clone());
        }
    }
    let to_remove = current
        .iter()
        .filter(|tag| !desired_set.contains(tag))
        .cloned()
        .collect();

    (to_add, to_remove)
}

pub struct RegistryService {
    repo: Arc<dyn ModelRepository>,
    telemetry: Telemetry,
}

impl RegistryService {
    pub fn new(repo: Arc<dyn ModelRepository>, telemetry: Telemetry) -> Self {
        Self { repo, telemetry }
    }

    /// Record a failed operation in logs and metrics, then hand the result back unchanged.
    fn observe<T>(&self, op: &'static str, model_id: Option<Uuid>, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let span = self.telemetry.span();
            match err.kind() {
                ErrorKind::NotFound => {
                    self.telemetry.metrics().not_found();
                    debug!(parent: span, op, model_id = ?model_id, "model not found");
                }
                ErrorKind::Internal => {
                    self.telemetry.metrics().internal_error();
                    error!(parent: span, op, model_id = ?model_id, error = ?err, "operation failed");
                }
                ErrorKind::Duplicate | ErrorKind::InvalidInput => {
                    warn!(parent: span, op, model_id = ?model_id, error = %err, "request rejected");
                }
            }
        }
        result
    }

    /// Best-effort step after a committed create: failures are logged and counted, not returned.
    fn swallow(&self, step: &'static str, model_id: Uuid, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.telemetry.metrics().swallowed_failure();
                error!(
                    parent: self.telemetry.span(),
                    step,
                    %model_id,
                    error = ?err,
                    "post-create step failed, model kept without it"
                );
                false
            }
        }
    }
}

#[async_trait]
impl ModelService for RegistryService {
    async fn create_model(&self, req: CreateModelRequest) -> Result<Model> {
        let framework = self.observe("create_model", None, req.framework.parse::<ModelFramework>())?;
        let (tags, blank_tags) = validation::split_tags(req.tags);
        self.observe("create_model", None, validation::validate_metadata(&req.metadata))?;

        let mut model = Model::new(req.name, req.version, framework);
        model.description = req.description;
        model.owner_id = req.owner_id;
        model.tenant_id = req.tenant_id;
        model.is_public = req.is_public;
        model.size = req.size;
        model.checksum = req.checksum;
        model.storage_path = req.storage_path;
        model.docker_image = req.docker_image;

        let mut created = self.observe("create_model", None, self.repo.create(model).await)?;
        self.telemetry.metrics().model_created();

        if blank_tags > 0 {
            self.telemetry.metrics().swallowed_failure();
            warn!(
                parent: self.telemetry.span(),
                model_id = %created.id,
                blank_tags,
                "blank tag names dropped from create"
            );
        }

        if !tags.is_empty() && self.swallow("add_tags", created.id, self.repo.add_tags(created.id, &tags).await) {
            created.tags = tags;
            created.tags.sort();
        }

        if !req.metadata.is_empty()
            && self.swallow(
                "set_metadata",
                created.id,
                self.repo.set_metadata(created.id, &req.metadata).await,
            )
        {
            created.metadata = req.metadata;
        }

        info!(
            parent: self.telemetry.span(),
            model_id = %created.id,
            name = %created.name,
            version = %created.version,
            "model created"
        );
        Ok(created)
    }

    async fn get_model(&self, id: Uuid) -> Result<Model> {
        self.observe("get_model", Some(id), self.repo.get_by_id(id).await)
    }

    async fn get_model_by_name_and_version(&self, name: &str, version: &str) -> Result<Model> {
        let result = self.repo.get_by_name_and_version(name, version).await;
        self.observe("get_model_by_name_and_version", None, result)
    }

    async fn list_models(&self, filter: ModelFilter, pagination: Pagination) -> Result<ModelPage> {
        self.observe("list_models", None, self.repo.list(&filter, pagination).await)
    }

    async fn update_model(&self, id: Uuid, req: UpdateModelRequest) -> Result<Model> {
        let op = "update_model";
        if let Some(name) = &req.name {
            self.observe(op, Some(id), validation::require("name", name))?;
        }
        let desired_tags = match req.tags {
            Some(tags) => Some(self.observe(op, Some(id), validation::normalize_tags(tags))?),
            None => None,
        };
        if let Some(metadata) = &req.metadata {
            self.observe(op, Some(id), validation::validate_metadata(metadata))?;
        }

        let mut model = self.observe(op, Some(id), self.repo.get_by_id(id).await)?;
        if let Some(name) = req.name {
            model.name = name;
        }
        if let Some(description) = req.description {
            model.description = description;
        }
        if let Some(is_public) = req.is_public {
            model.is_public = is_public;
        }
        if let Some(size) = req.size {
            model.size = size;
        }
        if let Some(checksum) = req.checksum {
            model.checksum = checksum;
        }
        if let Some(storage_path) = req.storage_path {
            model.storage_path = storage_path;
        }
        if let Some(docker_image) = req.docker_image {
            model.docker_image = docker_image;
        }
        self.observe(op, Some(id), self.repo.update(&model).await)?;

        if let Some(desired) = desired_tags {
            let (to_add, to_remove) = tag_delta(&model.tags, &desired);
            if !to_add.is_empty() {
                self.observe(op, Some(id), self.repo.add_tags(id, &to_add).await)?;
            }
            if !to_remove.is_empty() {
                self.observe(op, Some(id), self.repo.remove_tags(id, &to_remove).await)?;
            }
        }

        if let Some(metadata) = req.metadata {
            self.observe(op, Some(id), self.repo.set_metadata(id, &metadata).await)?;
        }

        self.telemetry.metrics().model_updated();
        info!(parent: self.telemetry.span(), model_id = %id, "model updated");
        self.observe(op, Some(id), self.repo.get_by_id(id).await)
    }

    async fn update_model_status(&self, id: Uuid, status: ModelStatus) -> Result<()> {
        let result = self.repo.update_status(id, status).await;
        self.observe("update_model_status", Some(id), result)?;
        self.telemetry.metrics().status_updated();
        info!(parent: self.telemetry.span(), model_id = %id, %status, "model status updated");
        Ok(())
    }

    async fn delete_model(&self, id: Uuid) -> Result<()> {
        self.observe("delete_model", Some(id), self.repo.delete(id).await)?;
        self.telemetry.metrics().model_deleted();
        info!(parent: self.telemetry.span(), model_id = %id, "model deleted");
        Ok(())
    }

    async fn add_model_tags(&self, id: Uuid, tags: Vec<String>) -> Result<()> {
        let tags = self.observe("add_model_tags", Some(id), validation::normalize_tags(tags))?;
        let result = self.repo.add_tags(id, &tags).await;
        self.observe("add_model_tags", Some(id), result)
    }

    async fn remove_model_tags(&self, id: Uuid, tags: Vec<String>) -> Result<()> {
        let tags = self.observe("remove_model_tags", Some(id), validation::normalize_tags(tags))?;
        let result = self.repo.remove_tags(id, &tags).await;
        self.observe("remove_model_tags", Some(id), result)
    }

    async fn set_model_metadata(&self, id: Uuid, metadata: Metadata) -> Result<()> {
        self.observe("set_model_metadata", Some(id), validation::validate_metadata(&metadata))?;
        let result = self.repo.set_metadata(id, &metadata).await;
        self.observe("set_model_metadata", Some(id), result)
    }

    async fn get_model_metadata(&self, id: Uuid) -> Result<Metadata> {
        self.observe("get_model_metadata", Some(id), self.repo.get_metadata(id).await)
    }

    async fn record_model_version(&self, id: Uuid, req: RecordVersionRequest) -> Result<ModelVersion> {
        let op = "record_model_version";
        self.observe(op, Some(id), validation::require("version", &req.version))?;
        let model = self.observe(op, Some(id), self.repo.get_by_id(id).await)?;

        let record = ModelVersion {
            id: Uuid::nil(),
            model_id: id,
            version: req.version,
            status: model.status,
            size: req.size.unwrap_or(model.size),
            checksum: req.checksum.unwrap_or(model.checksum),
            storage_path: req.storage_path.unwrap_or(model.storage_path),
            docker_image: req.docker_image.unwrap_or(model.docker_image),
            change_log: req.change_log,
            created_by: req.created_by,
            created_at: OffsetDateTime::now_utc(),
        };
        let recorded = self.observe(op, Some(id), self.repo.add_version(record).await)?;
        info!(
            parent: self.telemetry.span(),
            model_id = %id,
            version = %recorded.version,
            "model version recorded"
        );
        Ok(recorded)
    }

    async fn list_model_versions(&self, id: Uuid) -> Result<Vec<ModelVersion>> {
        self.observe("list_model_versions", Some(id), self.repo.list_versions(id).await)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::repository::InMemoryModelRepository;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TagCall {
        Add(Vec<String>),
        Remove(Vec<String>),
    }

    /// Wraps the in-memory repository, records tag calls and optionally fails sub-steps.
    /// With `status_on_update` set, a status write lands just before every row update.
    struct Recording {
        inner: InMemoryModelRepository,
        calls: Mutex<Vec<TagCall>>,
        fail_side_steps: bool,
        status_on_update: Option<ModelStatus>,
    }

    impl Recording {
        fn new(fail_side_steps: bool) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryModelRepository::new(),
                calls: Mutex::new(Vec::new()),
                fail_side_steps,
                status_on_update: None,
            })
        }

        fn racing_status(status: ModelStatus) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryModelRepository::new(),
                calls: Mutex::new(Vec::new()),
                fail_side_steps: false,
                status_on_update: Some(status),
            })
        }

        fn take_calls(&self) -> Vec<TagCall> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }

        fn side_step(&self) -> Result<()> {
            if self.fail_side_steps {
                return Err(anyhow::anyhow!("connection reset").into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ModelRepository for Recording {
        async fn create(&self, model: Model) -> Result<Model> {
            self.inner.create(model).await
        }
        async fn get_by_id(&self, id: Uuid) -> Result<Model> {
            self.inner.get_by_id(id).await
        }
        async fn get_by_name_and_version(&self, name: &str, version: &str) -> Result<Model> {
            self.inner.get_by_name_and_version(name, version).await
        }
        async fn list(&self, filter: &ModelFilter, pagination: Pagination) -> Result<ModelPage> {
            self.inner.list(filter, pagination).await
        }
        async fn update(&self, model: &Model) -> Result<()> {
            if let Some(status) = self.status_on_update {
                self.inner.update_status(model.id, status).await?;
            }
            self.inner.update(model).await
        }
        async fn delete(&self, id: Uuid) -> Result<()> {
            self.inner.delete(id).await
        }
        async fn update_status(&self, id: Uuid, status: ModelStatus) -> Result<()> {
            self.inner.update_status(id, status).await
        }
        async fn add_tags(&self, model_id: Uuid, names: &[String]) -> Result<()> {
            self.calls.lock().unwrap().push(TagCall::Add(names.to_vec()));
            self.side_step()?;
            self.inner.add_tags(model_id, names).await
        }
        async fn remove_tags(&self, model_id: Uuid, names: &[String]) -> Result<()> {
            self.calls.lock().unwrap().push(TagCall::Remove(names.to_vec()));
            self.inner.remove_tags(model_id, names).await
        }
        async fn set_metadata(&self, model_id: Uuid, metadata: &Metadata) -> Result<()> {
            self.side_step()?;
            self.inner.set_metadata(model_id, metadata).await
        }
        async fn get_metadata(&self, model_id: Uuid) -> Result<Metadata> {
            self.inner.get_metadata(model_id).await
        }
        async fn add_version(&self, version: ModelVersion) -> Result<ModelVersion> {
            self.inner.add_version(version).await
        }
        async fn list_versions(&self, model_id: Uuid) -> Result<Vec<ModelVersion>> {
            self.inner.list_versions(model_id).await
        }
    }

    fn service(repo: Arc<Recording>) -> (RegistryService, Telemetry) {
        let telemetry = Telemetry::detached();
        (RegistryService::new(repo, telemetry.clone()), telemetry)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn request(name: &str, tags: &[&str]) -> CreateModelRequest {
        CreateModelRequest {
            name: name.into(),
            version: "1.0.0".into(),
            framework: "pytorch".into(),
            tags: strings(tags),
            ..Default::default()
        }
    }

    #[test]
    fn delta_is_a_symmetric_difference() {
        let (add, remove) = tag_delta(&strings(&["a", "b"]), &strings(&["b", "c"]));
        assert_eq!(add, strings(&["c"]));
        assert_eq!(remove, strings(&["a"]));

        let (add, remove) = tag_delta(&strings(&["a", "b"]), &strings(&["b", "a"]));
        assert!(add.is_empty() && remove.is_empty());

        let (add, remove) = tag_delta(&strings(&["a"]), &[]);
        assert!(add.is_empty());
        assert_eq!(remove, strings(&["a"]));
    }

    #[tokio::test]
    async fn create_validates_framework() {
        let (svc, _) = service(Recording::new(false));
        let mut req = request("bert", &[]);
        req.framework = "jax".into();
        let err = svc.create_model(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn create_attaches_tags_and_metadata() {
        let repo = Recording::new(false);
        let (svc, telemetry) = service(repo.clone());
        let mut req = request("bert", &["nlp", "encoder", "nlp"]);
        req.metadata = Metadata::from([("dataset".to_string(), "wiki".to_string())]);
        req.owner_id = "alice".into();

        let created = svc.create_model(req).await.unwrap();
        assert_eq!(created.status, ModelStatus::Pending);
        assert_eq!(created.tags, strings(&["encoder", "nlp"]));
        assert_eq!(repo.take_calls(), vec![TagCall::Add(strings(&["nlp", "encoder"]))]);

        let fetched = svc.get_model(created.id).await.unwrap();
        assert_eq!(fetched.tags, strings(&["encoder", "nlp"]));
        assert_eq!(fetched.metadata.get("dataset").map(String::as_str), Some("wiki"));
        assert_eq!(fetched.owner_id, "alice");
        assert_eq!(telemetry.metrics().snapshot().models_created, 1);
    }

    #[tokio::test]
    async fn create_swallows_tag_and_metadata_failures() {
        let (svc, telemetry) = service(Recording::new(true));
        let mut req = request("bert", &["nlp"]);
        req.metadata = Metadata::from([("k".to_string(), "v".to_string())]);

        let created = svc.create_model(req).await.unwrap();
        assert!(created.tags.is_empty());
        assert!(created.metadata.is_empty());

        let fetched = svc.get_model(created.id).await.unwrap();
        assert!(fetched.tags.is_empty());
        assert_eq!(telemetry.metrics().snapshot().swallowed_failures, 2);
    }

    #[tokio::test]
    async fn create_drops_blank_tags() {
        let repo = Recording::new(false);
        let (svc, telemetry) = service(repo.clone());

        let created = svc.create_model(request("bert", &["nlp", "  ", ""])).await.unwrap();
        assert_eq!(created.tags, strings(&["nlp"]));
        assert_eq!(repo.take_calls(), vec![TagCall::Add(strings(&["nlp"]))]);

        let snapshot = telemetry.metrics().snapshot();
        assert_eq!(snapshot.models_created, 1);
        assert_eq!(snapshot.swallowed_failures, 1);
    }

    #[tokio::test]
    async fn update_does_not_revert_a_concurrent_status_change() {
        let (svc, _) = service(Recording::racing_status(ModelStatus::Ready));
        let created = svc.create_model(request("bert", &[])).await.unwrap();
        assert_eq!(created.status, ModelStatus::Pending);

        let updated = svc
            .update_model(
                created.id,
                UpdateModelRequest {
                    description: Some("encoder".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "encoder");
        assert_eq!(updated.status, ModelStatus::Ready);
        assert_eq!(svc.get_model(created.id).await.unwrap().status, ModelStatus::Ready);
    }

    #[tokio::test]
    async fn update_with_same_tags_issues_no_tag_calls() {
        let repo = Recording::new(false);
        let (svc, _) = service(repo.clone());
        let created = svc.create_model(request("bert", &["a", "b"])).await.unwrap();
        repo.take_calls();

        let updated = svc
            .update_model(
                created.id,
                UpdateModelRequest {
                    tags: Some(strings(&["b", "a"])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(repo.take_calls().is_empty());
        assert_eq!(updated.tags, strings(&["a", "b"]));
    }

    #[tokio::test]
    async fn update_moves_tags_with_one_add_and_one_remove() {
        let repo = Recording::new(false);
        let (svc, _) = service(repo.clone());
        let created = svc.create_model(request("bert", &["a", "b"])).await.unwrap();
        repo.take_calls();

        let updated = svc
            .update_model(
                created.id,
                UpdateModelRequest {
                    tags: Some(strings(&["b", "c"])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            repo.take_calls(),
            vec![TagCall::Add(strings(&["c"])), TagCall::Remove(strings(&["a"]))]
        );
        assert_eq!(updated.tags, strings(&["b", "c"]));
    }

    #[tokio::test]
    async fn update_is_partial() {
        let repo = Recording::new(false);
        let (svc, _) = service(repo.clone());
        let mut req = request("bert", &["a"]);
        req.description = "original".into();
        req.metadata = Metadata::from([("k".to_string(), "v".to_string())]);
        let created = svc.create_model(req).await.unwrap();
        repo.take_calls();

        let updated = svc
            .update_model(
                created.id,
                UpdateModelRequest {
                    is_public: Some(true),
                    storage_path: Some("s3://bucket/bert".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_public);
        assert_eq!(updated.storage_path, "s3://bucket/bert");
        assert_eq!(updated.description, "original");
        assert_eq!(updated.name, "bert");
        assert_eq!(updated.tags, strings(&["a"]));
        assert_eq!(updated.metadata.len(), 1);
        assert!(repo.take_calls().is_empty());

        let cleared = svc
            .update_model(
                created.id,
                UpdateModelRequest {
                    tags: Some(Vec::new()),
                    metadata: Some(Metadata::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.tags.is_empty());
        assert!(cleared.metadata.is_empty());
    }

    #[tokio::test]
    async fn update_rejects_blank_name_and_unknown_ids() {
        let (svc, _) = service(Recording::new(false));
        let created = svc.create_model(request("bert", &[])).await.unwrap();
        let err = svc
            .update_model(
                created.id,
                UpdateModelRequest {
                    name: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = svc
            .update_model(Uuid::new_v4(), UpdateModelRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn thin_operations_propagate_not_found() {
        let (svc, telemetry) = service(Recording::new(false));
        let id = Uuid::new_v4();
        assert_eq!(svc.delete_model(id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            svc.update_model_status(id, ModelStatus::Ready).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.add_model_tags(id, strings(&["x"])).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.remove_model_tags(id, strings(&["x"])).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.set_model_metadata(id, Metadata::new()).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            svc.get_model_metadata(id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(telemetry.metrics().snapshot().not_found, 6);
    }

    #[tokio::test]
    async fn metadata_set_then_get_has_no_residue() {
        let (svc, _) = service(Recording::new(false));
        let created = svc.create_model(request("bert", &[])).await.unwrap();
        let first = Metadata::from([("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
        let second = Metadata::from([("c".to_string(), "3".to_string())]);

        svc.set_model_metadata(created.id, first).await.unwrap();
        svc.set_model_metadata(created.id, second.clone()).await.unwrap();
        assert_eq!(svc.get_model_metadata(created.id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn delete_twice() {
        let (svc, telemetry) = service(Recording::new(false));
        let created = svc.create_model(request("bert", &[])).await.unwrap();
        svc.delete_model(created.id).await.unwrap();
        assert_eq!(
            svc.delete_model(created.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(telemetry.metrics().snapshot().models_deleted, 1);
    }

    #[tokio::test]
    async fn versions_snapshot_the_model() {
        let (svc, _) = service(Recording::new(false));
        let mut req = request("bert", &[]);
        req.checksum = "sha256:aa".into();
        req.size = 10;
        let created = svc.create_model(req).await.unwrap();
        svc.update_model_status(created.id, ModelStatus::Ready).await.unwrap();

        let recorded = svc
            .record_model_version(
                created.id,
                RecordVersionRequest {
                    version: "v1".into(),
                    size: Some(12),
                    change_log: "first".into(),
                    created_by: "alice".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(recorded.status, ModelStatus::Ready);
        assert_eq!(recorded.size, 12);
        assert_eq!(recorded.checksum, "sha256:aa");

        let err = svc
            .record_model_version(created.id, RecordVersionRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let history = svc.list_model_versions(created.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
