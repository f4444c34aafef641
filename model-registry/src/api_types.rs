//! JSON types of the REST API, and their translation into service requests.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    entity::{Metadata, Model, ModelVersion},
    error::Result,
    repository::{ModelFilter, ModelPage, Pagination},
    service, validation,
};

/// A model as rendered to REST clients. Timestamps are RFC 3339.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelBody {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub version: String,
    pub framework: String,
    pub status: String,
    pub size: u64,
    pub checksum: String,
    pub storage_path: String,
    pub docker_image: String,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub owner_id: String,
    pub tenant_id: String,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Model> for ModelBody {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            version: model.version,
            framework: model.framework.to_string(),
            status: model.status.to_string(),
            size: model.size,
            checksum: model.checksum,
            storage_path: model.storage_path,
            docker_image: model.docker_image,
            tags: model.tags,
            metadata: model.metadata,
            owner_id: model.owner_id,
            tenant_id: model.tenant_id,
            is_public: model.is_public,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CreateModelBody {
    pub name: String,
    pub description: String,
    pub version: String,
    pub framework: String,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub is_public: bool,
    pub owner_id: String,
    pub tenant_id: String,
    pub size: i64,
    pub checksum: String,
    pub storage_path: String,
    pub docker_image: String,
}

impl CreateModelBody {
    pub fn into_request(self) -> Result<service::CreateModelRequest> {
        validation::require_create_fields(&self.name, &self.version, &self.framework)?;
        Ok(service::CreateModelRequest {
            size: validation::size_from_wire(self.size)?,
            name: self.name,
            description: self.description,
            version: self.version,
            framework: self.framework,
            tags: self.tags,
            metadata: self.metadata,
            owner_id: self.owner_id,
            tenant_id: self.tenant_id,
            is_public: self.is_public,
            checksum: self.checksum,
            storage_path: self.storage_path,
            docker_image: self.docker_image,
        })
    }
}

/// Partial update: absent fields are left untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdateModelBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub size: Option<i64>,
    pub checksum: Option<String>,
    pub storage_path: Option<String>,
    pub docker_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Metadata>,
}

impl UpdateModelBody {
    pub fn into_request(self) -> Result<service::UpdateModelRequest> {
        let size = self.size.map(validation::size_from_wire).transpose()?;
        Ok(service::UpdateModelRequest {
            name: self.name,
            description: self.description,
            is_public: self.is_public,
            size,
            checksum: self.checksum,
            storage_path: self.storage_path,
            docker_image: self.docker_image,
            tags: self.tags,
            metadata: self.metadata,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateStatusBody {
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TagsBody {
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBody {
    pub metadata: Metadata,
}

/// Query string of `GET /v1/models`. `tags` is comma-separated.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ListModelsQuery {
    pub name: Option<String>,
    pub framework: Option<String>,
    pub status: Option<String>,
    pub owner_id: Option<String>,
    pub tenant_id: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListModelsQuery {
    pub fn into_filter(self) -> Result<(ModelFilter, Pagination)> {
        let filter = ModelFilter {
            name: validation::non_blank(self.name),
            framework: validation::non_blank(self.framework)
                .map(|f| f.trim().parse())
                .transpose()?,
            status: validation::non_blank(self.status)
                .map(|s| s.trim().parse())
                .transpose()?,
            owner_id: validation::non_blank(self.owner_id),
            tenant_id: validation::non_blank(self.tenant_id),
            is_public: self.is_public,
            tags: self
                .tags
                .map(|tags| {
                    tags.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        };
        Ok((
            filter,
            Pagination {
                page: self.page,
                limit: self.limit,
            },
        ))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListModelsResponse {
    pub models: Vec<ModelBody>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl From<ModelPage> for ListModelsResponse {
    fn from(page: ModelPage) -> Self {
        Self {
            models: page.models.into_iter().map(ModelBody::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RecordVersionBody {
    pub version: String,
    pub size: Option<i64>,
    pub checksum: Option<String>,
    pub storage_path: Option<String>,
    pub docker_image: Option<String>,
    pub change_log: String,
    pub created_by: String,
}

impl RecordVersionBody {
    pub fn into_request(self) -> Result<service::RecordVersionRequest> {
        validation::require("version", &self.version)?;
        Ok(service::RecordVersionRequest {
            size: self.size.map(validation::size_from_wire).transpose()?,
            version: self.version,
            checksum: self.checksum,
            storage_path: self.storage_path,
            docker_image: self.docker_image,
            change_log: self.change_log,
            created_by: self.created_by,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionBody {
    pub id: Uuid,
    pub model_id: Uuid,
    pub version: String,
    pub status: String,
    pub size: u64,
    pub checksum: String,
    pub storage_path: String,
    pub docker_image: String,
    pub change_log: String,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ModelVersion> for VersionBody {
    fn from(version: ModelVersion) -> Self {
        Self {
            id: version.id,
            model_id: version.model_id,
            version: version.version,
            status: version.status.to_string(),
            size: version.size,
            checksum: version.checksum,
            storage_path: version.storage_path,
            docker_image: version.docker_image,
            change_log: version.change_log,
            created_by: version.created_by,
            created_at: version.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListVersionsResponse {
    pub versions: Vec<VersionBody>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}
