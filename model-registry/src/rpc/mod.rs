//! RPC adapter: translates `registry.v1.ModelRegistry` calls into [ModelService] calls.
//!
//! Field-presence checks mirror the REST adapter. Errors map to status codes by kind only:
//! not-found becomes `NOT_FOUND` and everything else, rejected input included, `INTERNAL` with a
//! generic message. The underlying error is only logged.

use std::sync::Arc;

use time::OffsetDateTime;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::{
    entity::{self, ModelStatus},
    error::{parse_model_id, ErrorKind, RegistryError},
    observe::Telemetry,
    repository::{ModelFilter, Pagination},
    service::{CreateModelRequest, ModelService, RecordVersionRequest, UpdateModelRequest},
    validation,
};

pub mod proto;

pub use proto::model_registry_client::ModelRegistryClient;
pub use proto::model_registry_server::{ModelRegistry, ModelRegistryServer};

pub struct ModelRegistryRpc {
    service: Arc<dyn ModelService>,
    telemetry: Telemetry,
}

impl ModelRegistryRpc {
    pub fn new(service: Arc<dyn ModelService>, telemetry: Telemetry) -> Self {
        Self { service, telemetry }
    }

    pub fn into_server(self) -> ModelRegistryServer<Self> {
        ModelRegistryServer::new(self)
    }

    fn status(&self, method: &'static str, err: RegistryError) -> Status {
        tracing::debug!(parent: self.telemetry.span(), method, error = %err, "rpc failed");
        to_status(err)
    }
}

pub fn to_status(err: RegistryError) -> Status {
    match err.kind() {
        ErrorKind::NotFound => Status::not_found("model not found"),
        ErrorKind::InvalidInput | ErrorKind::Duplicate | ErrorKind::Internal => {
            Status::internal("internal error")
        }
    }
}

fn timestamp(at: OffsetDateTime) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.unix_timestamp(),
        nanos: at.nanosecond() as i32,
    }
}

fn size_to_wire(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn non_empty(value: String) -> Option<String> {
    validation::non_blank(Some(value))
}

impl From<entity::Model> for proto::Model {
    fn from(model: entity::Model) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name,
            description: model.description,
            version: model.version,
            framework: model.framework.to_string(),
            status: model.status.to_string(),
            size: size_to_wire(model.size),
            checksum: model.checksum,
            storage_path: model.storage_path,
            docker_image: model.docker_image,
            tags: model.tags,
            metadata: model.metadata,
            owner_id: model.owner_id,
            tenant_id: model.tenant_id,
            is_public: model.is_public,
            created_at: Some(timestamp(model.created_at)),
            updated_at: Some(timestamp(model.updated_at)),
        }
    }
}

impl From<entity::ModelVersion> for proto::ModelVersion {
    fn from(version: entity::ModelVersion) -> Self {
        Self {
            id: version.id.to_string(),
            model_id: version.model_id.to_string(),
            version: version.version,
            status: version.status.to_string(),
            size: size_to_wire(version.size),
            checksum: version.checksum,
            storage_path: version.storage_path,
            docker_image: version.docker_image,
            change_log: version.change_log,
            created_by: version.created_by,
            created_at: Some(timestamp(version.created_at)),
        }
    }
}

fn create_request(req: proto::CreateModelRequest) -> crate::error::Result<CreateModelRequest> {
    validation::require_create_fields(&req.name, &req.version, &req.framework)?;
    Ok(CreateModelRequest {
        size: validation::size_from_wire(req.size)?,
        name: req.name,
        description: req.description,
        version: req.version,
        framework: req.framework,
        tags: req.tags,
        metadata: req.metadata,
        owner_id: req.owner_id,
        tenant_id: req.tenant_id,
        is_public: req.is_public,
        checksum: req.checksum,
        storage_path: req.storage_path,
        docker_image: req.docker_image,
    })
}

fn update_request(req: proto::UpdateModelRequest) -> crate::error::Result<(Uuid, UpdateModelRequest)> {
    let id = parse_model_id(&req.id)?;
    Ok((
        id,
        UpdateModelRequest {
            name: req.name,
            description: req.description,
            is_public: req.is_public,
            size: req.size.map(validation::size_from_wire).transpose()?,
            checksum: req.checksum,
            storage_path: req.storage_path,
            docker_image: req.docker_image,
            tags: req.tags.map(|list| list.tags),
            metadata: req.metadata.map(|map| map.entries),
        },
    ))
}

fn list_request(req: proto::ListModelsRequest) -> crate::error::Result<(ModelFilter, Pagination)> {
    let filter = ModelFilter {
        name: non_empty(req.name),
        framework: non_empty(req.framework).map(|f| f.trim().parse()).transpose()?,
        status: non_empty(req.status).map(|s| s.trim().parse()).transpose()?,
        owner_id: non_empty(req.owner_id),
        tenant_id: non_empty(req.tenant_id),
        is_public: req.is_public,
        tags: req.tags,
    };
    Ok((filter, Pagination::new(req.page.into(), req.limit.into())))
}

fn version_request(req: proto::RecordModelVersionRequest) -> crate::error::Result<(Uuid, RecordVersionRequest)> {
    let id = parse_model_id(&req.model_id)?;
    validation::require("version", &req.version)?;
    Ok((
        id,
        RecordVersionRequest {
            version: req.version,
            size: req.size.map(validation::size_from_wire).transpose()?,
            checksum: req.checksum,
            storage_path: req.storage_path,
            docker_image: req.docker_image,
            change_log: req.change_log,
            created_by: req.created_by,
        },
    ))
}

#[tonic::async_trait]
impl ModelRegistry for ModelRegistryRpc {
    async fn create_model(
        &self,
        request: Request<proto::CreateModelRequest>,
    ) -> Result<Response<proto::CreateModelResponse>, Status> {
        let req = create_request(request.into_inner()).map_err(|e| self.status("CreateModel", e))?;
        let model = self
            .service
            .create_model(req)
            .await
            .map_err(|e| self.status("CreateModel", e))?;
        Ok(Response::new(proto::CreateModelResponse {
            model: Some(model.into()),
        }))
    }

    async fn get_model(
        &self,
        request: Request<proto::GetModelRequest>,
    ) -> Result<Response<proto::GetModelResponse>, Status> {
        let result = match parse_model_id(&request.into_inner().id) {
            Ok(id) => self.service.get_model(id).await,
            Err(err) => Err(err),
        };
        let model = result.map_err(|e| self.status("GetModel", e))?;
        Ok(Response::new(proto::GetModelResponse {
            model: Some(model.into()),
        }))
    }

    async fn get_model_by_name_and_version(
        &self,
        request: Request<proto::GetModelByNameAndVersionRequest>,
    ) -> Result<Response<proto::GetModelResponse>, Status> {
        let req = request.into_inner();
        let model = self
            .service
            .get_model_by_name_and_version(&req.name, &req.version)
            .await
            .map_err(|e| self.status("GetModelByNameAndVersion", e))?;
        Ok(Response::new(proto::GetModelResponse {
            model: Some(model.into()),
        }))
    }

    async fn list_models(
        &self,
        request: Request<proto::ListModelsRequest>,
    ) -> Result<Response<proto::ListModelsResponse>, Status> {
        let (filter, pagination) =
            list_request(request.into_inner()).map_err(|e| self.status("ListModels", e))?;
        let page = self
            .service
            .list_models(filter, pagination)
            .await
            .map_err(|e| self.status("ListModels", e))?;
        Ok(Response::new(proto::ListModelsResponse {
            total: i64::try_from(page.total).unwrap_or(i64::MAX),
            page: i32::try_from(page.page).unwrap_or(i32::MAX),
            limit: page.limit as i32,
            models: page.models.into_iter().map(proto::Model::from).collect(),
        }))
    }

    async fn update_model(
        &self,
        request: Request<proto::UpdateModelRequest>,
    ) -> Result<Response<proto::UpdateModelResponse>, Status> {
        let (id, req) = update_request(request.into_inner()).map_err(|e| self.status("UpdateModel", e))?;
        let model = self
            .service
            .update_model(id, req)
            .await
            .map_err(|e| self.status("UpdateModel", e))?;
        Ok(Response::new(proto::UpdateModelResponse {
            model: Some(model.into()),
        }))
    }

    /// Unlike the REST surface, answers with the updated model.
    async fn update_model_status(
        &self,
        request: Request<proto::UpdateModelStatusRequest>,
    ) -> Result<Response<proto::UpdateModelStatusResponse>, Status> {
        let req = request.into_inner();
        let parsed = parse_model_id(&req.id)
            .and_then(|id| Ok((id, req.status.trim().parse::<ModelStatus>()?)));
        let (id, status) = parsed.map_err(|e| self.status("UpdateModelStatus", e))?;

        self.service
            .update_model_status(id, status)
            .await
            .map_err(|e| self.status("UpdateModelStatus", e))?;
        let model = self
            .service
            .get_model(id)
            .await
            .map_err(|e| self.status("UpdateModelStatus", e))?;
        Ok(Response::new(proto::UpdateModelStatusResponse {
            model: Some(model.into()),
        }))
    }

    async fn delete_model(
        &self,
        request: Request<proto::DeleteModelRequest>,
    ) -> Result<Response<proto::Empty>, Status> {
        let result = match parse_model_id(&request.into_inner().id) {
            Ok(id) => self.service.delete_model(id).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| self.status("DeleteModel", e))?;
        Ok(Response::new(proto::Empty {}))
    }

    async fn add_model_tags(
        &self,
        request: Request<proto::AddModelTagsRequest>,
    ) -> Result<Response<proto::Empty>, Status> {
        let req = request.into_inner();
        let result = match parse_model_id(&req.model_id) {
            Ok(id) => self.service.add_model_tags(id, req.tags).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| self.status("AddModelTags", e))?;
        Ok(Response::new(proto::Empty {}))
    }

    async fn remove_model_tags(
        &self,
        request: Request<proto::RemoveModelTagsRequest>,
    ) -> Result<Response<proto::Empty>, Status> {
        let req = request.into_inner();
        let result = match parse_model_id(&req.model_id) {
            Ok(id) => self.service.remove_model_tags(id, req.tags).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| self.status("RemoveModelTags", e))?;
        Ok(Response::new(proto::Empty {}))
    }

    async fn set_model_metadata(
        &self,
        request: Request<proto::SetModelMetadataRequest>,
    ) -> Result<Response<proto::Empty>, Status> {
        let req = request.into_inner();
        let result = match parse_model_id(&req.model_id) {
            Ok(id) => self.service.set_model_metadata(id, req.metadata).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| self.status("SetModelMetadata", e))?;
        Ok(Response::new(proto::Empty {}))
    }

    async fn get_model_metadata(
        &self,
        request: Request<proto::GetModelMetadataRequest>,
    ) -> Result<Response<proto::GetModelMetadataResponse>, Status> {
        let result = match parse_model_id(&request.into_inner().model_id) {
            Ok(id) => self.service.get_model_metadata(id).await,
            Err(err) => Err(err),
        };
        let metadata = result.map_err(|e| self.status("GetModelMetadata", e))?;
        Ok(Response::new(proto::GetModelMetadataResponse { metadata }))
    }

    async fn record_model_version(
        &self,
        request: Request<proto::RecordModelVersionRequest>,
    ) -> Result<Response<proto::RecordModelVersionResponse>, Status> {
        let (id, req) =
            version_request(request.into_inner()).map_err(|e| self.status("RecordModelVersion", e))?;
        let record = self
            .service
            .record_model_version(id, req)
            .await
            .map_err(|e| self.status("RecordModelVersion", e))?;
        Ok(Response::new(proto::RecordModelVersionResponse {
            record: Some(record.into()),
        }))
    }

    async fn list_model_versions(
        &self,
        request: Request<proto::ListModelVersionsRequest>,
    ) -> Result<Response<proto::ListModelVersionsResponse>, Status> {
        let result = match parse_model_id(&request.into_inner().model_id) {
            Ok(id) => self.service.list_model_versions(id).await,
            Err(err) => Err(err),
        };
        let versions = result.map_err(|e| self.status("ListModelVersions", e))?;
        Ok(Response::new(proto::ListModelVersionsResponse {
            versions: versions.into_iter().map(proto::ModelVersion::from).collect(),
        }))
    }
}
