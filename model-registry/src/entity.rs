//! In-memory representation of the catalog: models, the shared tag vocabulary, metadata entries
//! and version records. Plain data, no storage concerns.

use std::{collections::BTreeMap, fmt, str::FromStr};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::RegistryError;

/// Model-scoped key/value annotations. Ordered so every surface renders them identically.
pub type Metadata = BTreeMap<String, String>;

/// Lifecycle status of a model. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelStatus {
    #[default]
    Pending,
    Building,
    Ready,
    Deploying,
    Running,
    Failed,
    Archived,
}

impl ModelStatus {
    pub const ALL: [ModelStatus; 7] = [
        Self::Pending,
        Self::Building,
        Self::Ready,
        Self::Deploying,
        Self::Running,
        Self::Failed,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Ready => "ready",
            Self::Deploying => "deploying",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelStatus {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| RegistryError::invalid(format!("unknown status {s:?}")))
    }
}

/// Machine learning frameworks a model may be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFramework {
    PyTorch,
    TensorFlow,
    Onnx,
    SkLearn,
    XgBoost,
    Custom,
}

impl ModelFramework {
    pub const ALL: [ModelFramework; 6] = [
        Self::PyTorch,
        Self::TensorFlow,
        Self::Onnx,
        Self::SkLearn,
        Self::XgBoost,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PyTorch => "pytorch",
            Self::TensorFlow => "tensorflow",
            Self::Onnx => "onnx",
            Self::SkLearn => "sklearn",
            Self::XgBoost => "xgboost",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ModelFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFramework {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|framework| framework.as_str() == s)
            .ok_or_else(|| RegistryError::invalid(format!("unsupported framework {s:?}")))
    }
}

/// Whether a row is live or has been soft deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted { at: OffsetDateTime },
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn deleted_at(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(*at),
        }
    }
}

impl From<Option<OffsetDateTime>> for Lifecycle {
    fn from(deleted_at: Option<OffsetDateTime>) -> Self {
        match deleted_at {
            None => Self::Active,
            Some(at) => Self::Deleted { at },
        }
    }
}

/// A catalogued ML artifact record. Identity is the `id`; everything else is mutable state.
#[derive(Debug, Clone)]
pub struct Model {
    /// Nil until the repository assigns one.
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub version: String,
    pub framework: ModelFramework,
    pub status: ModelStatus,
    /// Size of the stored artifact, in bytes.
    pub size: u64,
    pub checksum: String,
    pub storage_path: String,
    pub docker_image: String,
    /// Tag names, sorted.
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub owner_id: String,
    pub tenant_id: String,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub lifecycle: Lifecycle,
}

impl Model {
    /// A fresh, not yet persisted model. Status starts at [ModelStatus::Pending].
    pub fn new(name: impl Into<String>, version: impl Into<String>, framework: ModelFramework) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::nil(),
            name: name.into(),
            description: String::new(),
            version: version.into(),
            framework,
            status: ModelStatus::default(),
            size: 0,
            checksum: String::new(),
            storage_path: String::new(),
            docker_image: String::new(),
            tags: Vec::new(),
            metadata: Metadata::new(),
            owner_id: String::new(),
            tenant_id: String::new(),
            is_public: false,
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        }
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Model {}

/// A label from the shared vocabulary. Tags outlive the models that reference them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub model_id: Uuid,
    pub key: String,
    pub value: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Append-only snapshot of a model under a version label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub id: Uuid,
    pub model_id: Uuid,
    pub version: String,
    pub status: ModelStatus,
    pub size: u64,
    pub checksum: String,
    pub storage_path: String,
    pub docker_image: String,
    pub change_log: String,
    pub created_by: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    Admin,
    #[default]
    Developer,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

/// Platform user. Consulted by the authorization layer in front of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub tenant_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub lifecycle: Lifecycle,
}

/// Resource ceilings for a tenant. Declared here, enforced elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantQuota {
    pub max_models: u32,
    pub max_storage_gb: u32,
    pub max_inference_qps: u32,
    pub max_inference_concurrency: u32,
}

impl Default for TenantQuota {
    fn default() -> Self {
        Self {
            max_models: 10,
            max_storage_gb: 100,
            max_inference_qps: 100,
            max_inference_concurrency: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub quota: TenantQuota,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub lifecycle: Lifecycle,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_models_start_pending() {
        let model = Model::new("bert-base", "1.0.0", ModelFramework::PyTorch);
        assert_eq!(model.status, ModelStatus::Pending);
        assert!(model.id.is_nil());
        assert!(model.lifecycle.is_active());
        assert_eq!(model.size, 0);
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for status in ModelStatus::ALL {
            assert_eq!(status.as_str().parse::<ModelStatus>().unwrap(), status);
        }
        for framework in ModelFramework::ALL {
            assert_eq!(framework.to_string().parse::<ModelFramework>().unwrap(), framework);
        }
        assert!("PyTorch".parse::<ModelFramework>().is_err());
        assert!("jax".parse::<ModelFramework>().is_err());
        assert!("deleted".parse::<ModelStatus>().is_err());
    }

    #[test]
    fn identity_is_by_id() {
        let mut a = Model::new("a", "1", ModelFramework::Onnx);
        let mut b = Model::new("b", "2", ModelFramework::Custom);
        let id = Uuid::new_v4();
        a.id = id;
        b.id = id;
        assert_eq!(a, b);
        b.id = Uuid::new_v4();
        assert_ne!(a, b);
    }

    #[test]
    fn lifecycle_marker() {
        let at = OffsetDateTime::now_utc();
        assert_eq!(Lifecycle::from(None), Lifecycle::Active);
        let deleted = Lifecycle::from(Some(at));
        assert!(!deleted.is_active());
        assert_eq!(deleted.deleted_at(), Some(at));
    }

    #[test]
    fn quota_defaults() {
        let quota = TenantQuota::default();
        assert_eq!(quota.max_models, 10);
        assert_eq!(quota.max_storage_gb, 100);
        assert_eq!(quota.max_inference_qps, 100);
        assert_eq!(quota.max_inference_concurrency, 10);
        assert_eq!(UserRole::default(), UserRole::Developer);
    }
}
