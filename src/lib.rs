//! Typed client an edge service uses to reach the model registry as if it were local.
//!
//! The gateway is a pass-through: every call maps to one RPC, and a failing call hands the
//! server's [Status] back unchanged. Timeouts and keep-alive belong to the transport, with an
//! optional tighter deadline per call; there are no automatic retries. Failures are logged under
//! the gateway's [Telemetry] span and counted in its metrics.

use std::{collections::BTreeMap, time::Duration};

use anyhow::{Context, Result};
use tonic::{
    transport::{Channel, Endpoint},
    Code, Status,
};
use tracing::error;

use model_registry::{
    observe::Telemetry,
    rpc::{proto, ModelRegistryClient},
};

#[macro_use]
extern crate async_trait;

pub use model_registry::rpc::proto::{
    CreateModelRequest, ListModelsRequest, Model, ModelVersion, RecordModelVersionRequest,
    UpdateModelRequest,
};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Registry RPC address, e.g. `http://127.0.0.1:9090`.
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Deadline applied to every call.
    pub request_timeout: Duration,
    pub keep_alive_interval: Duration,
    pub keep_alive_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9090".to_owned(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            keep_alive_interval: Duration::from_secs(10),
            keep_alive_timeout: Duration::from_secs(20),
        }
    }
}

impl GatewayConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    fn endpoint(&self) -> Result<Endpoint> {
        Ok(Endpoint::from_shared(self.endpoint.clone())
            .with_context(|| format!("invalid registry endpoint {:?}", self.endpoint))?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .http2_keep_alive_interval(self.keep_alive_interval)
            .keep_alive_timeout(self.keep_alive_timeout)
            .keep_alive_while_idle(true))
    }
}

pub type GatewayResult<T> = std::result::Result<T, Status>;

/// Registry operations as seen from the edge.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    async fn create_model(&self, req: CreateModelRequest) -> GatewayResult<Model>;
    async fn get_model(&self, id: &str) -> GatewayResult<Model>;
    async fn get_model_by_name_and_version(&self, name: &str, version: &str) -> GatewayResult<Model>;
    /// Returns the page of models and the total size of the filtered set.
    async fn list_models(&self, req: ListModelsRequest) -> GatewayResult<(Vec<Model>, i64)>;
    async fn update_model(&self, req: UpdateModelRequest) -> GatewayResult<Model>;
    async fn update_model_status(&self, id: &str, status: &str) -> GatewayResult<Model>;
    async fn delete_model(&self, id: &str) -> GatewayResult<()>;
    async fn add_model_tags(&self, model_id: &str, tags: Vec<String>) -> GatewayResult<()>;
    async fn remove_model_tags(&self, model_id: &str, tags: Vec<String>) -> GatewayResult<()>;
    async fn set_model_metadata(&self, model_id: &str, metadata: BTreeMap<String, String>) -> GatewayResult<()>;
    async fn get_model_metadata(&self, model_id: &str) -> GatewayResult<BTreeMap<String, String>>;
    async fn record_model_version(&self, req: RecordModelVersionRequest) -> GatewayResult<ModelVersion>;
    async fn list_model_versions(&self, model_id: &str) -> GatewayResult<Vec<ModelVersion>>;
}

/// [RegistryGateway] over a tonic channel.
#[derive(Clone)]
pub struct GrpcGateway {
    client: ModelRegistryClient<Channel>,
    telemetry: Telemetry,
    call_timeout: Option<Duration>,
}

impl GrpcGateway {
    /// Dial the registry now, failing if it cannot be reached within the connect timeout.
    pub async fn connect(config: &GatewayConfig, telemetry: Telemetry) -> Result<Self> {
        let channel = config
            .endpoint()?
            .connect()
            .await
            .with_context(|| format!("failed to connect to registry at {}", config.endpoint))?;
        Ok(Self::from_channel(channel, telemetry))
    }

    /// Build the gateway without dialing; the connection is made on first use.
    pub fn connect_lazy(config: &GatewayConfig, telemetry: Telemetry) -> Result<Self> {
        Ok(Self::from_channel(config.endpoint()?.connect_lazy(), telemetry))
    }

    pub fn from_channel(channel: Channel, telemetry: Telemetry) -> Self {
        Self {
            client: ModelRegistryClient::new(channel),
            telemetry,
            call_timeout: None,
        }
    }

    /// Send a `grpc-timeout` deadline with every call. The channel's request timeout still applies.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    fn client(&self) -> ModelRegistryClient<Channel> {
        self.client.clone()
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(timeout) = self.call_timeout {
            request.set_timeout(timeout);
        }
        request
    }

    fn logged<T>(
        &self,
        method: &'static str,
        result: GatewayResult<tonic::Response<T>>,
    ) -> GatewayResult<T> {
        result.map(tonic::Response::into_inner).map_err(|status| {
            if status.code() == Code::NotFound {
                self.telemetry.metrics().not_found();
            } else {
                self.telemetry.metrics().internal_error();
            }
            error!(
                parent: self.telemetry.span(),
                method,
                code = ?status.code(),
                message = status.message(),
                "registry call failed"
            );
            status
        })
    }

    fn require<T>(
        &self,
        method: &'static str,
        what: &'static str,
        value: Option<T>,
    ) -> GatewayResult<T> {
        value.ok_or_else(|| {
            self.telemetry.metrics().internal_error();
            error!(parent: self.telemetry.span(), method, what, "registry answered without a body");
            Status::internal(format!("registry answered without a {what}"))
        })
    }
}

#[async_trait]
impl RegistryGateway for GrpcGateway {
    async fn create_model(&self, req: CreateModelRequest) -> GatewayResult<Model> {
        let resp = self.logged("CreateModel", self.client().create_model(self.request(req)).await)?;
        self.require("CreateModel", "model", resp.model)
    }

    async fn get_model(&self, id: &str) -> GatewayResult<Model> {
        let req = proto::GetModelRequest { id: id.to_owned() };
        let resp = self.logged("GetModel", self.client().get_model(self.request(req)).await)?;
        self.require("GetModel", "model", resp.model)
    }

    async fn get_model_by_name_and_version(&self, name: &str, version: &str) -> GatewayResult<Model> {
        let req = proto::GetModelByNameAndVersionRequest {
            name: name.to_owned(),
            version: version.to_owned(),
        };
        let resp = self.logged(
            "GetModelByNameAndVersion",
            self.client().get_model_by_name_and_version(self.request(req)).await,
        )?;
        self.require("GetModelByNameAndVersion", "model", resp.model)
    }

    async fn list_models(&self, req: ListModelsRequest) -> GatewayResult<(Vec<Model>, i64)> {
        let resp = self.logged("ListModels", self.client().list_models(self.request(req)).await)?;
        Ok((resp.models, resp.total))
    }

    async fn update_model(&self, req: UpdateModelRequest) -> GatewayResult<Model> {
        let resp = self.logged("UpdateModel", self.client().update_model(self.request(req)).await)?;
        self.require("UpdateModel", "model", resp.model)
    }

    async fn update_model_status(&self, id: &str, status: &str) -> GatewayResult<Model> {
        let req = proto::UpdateModelStatusRequest {
            id: id.to_owned(),
            status: status.to_owned(),
        };
        let resp = self.logged(
            "UpdateModelStatus",
            self.client().update_model_status(self.request(req)).await,
        )?;
        self.require("UpdateModelStatus", "model", resp.model)
    }

    async fn delete_model(&self, id: &str) -> GatewayResult<()> {
        let req = proto::DeleteModelRequest { id: id.to_owned() };
        self.logged("DeleteModel", self.client().delete_model(self.request(req)).await)?;
        Ok(())
    }

    async fn add_model_tags(&self, model_id: &str, tags: Vec<String>) -> GatewayResult<()> {
        let req = proto::AddModelTagsRequest {
            model_id: model_id.to_owned(),
            tags,
        };
        self.logged("AddModelTags", self.client().add_model_tags(self.request(req)).await)?;
        Ok(())
    }

    async fn remove_model_tags(&self, model_id: &str, tags: Vec<String>) -> GatewayResult<()> {
        let req = proto::RemoveModelTagsRequest {
            model_id: model_id.to_owned(),
            tags,
        };
        self.logged("RemoveModelTags", self.client().remove_model_tags(self.request(req)).await)?;
        Ok(())
    }

    async fn set_model_metadata(&self, model_id: &str, metadata: BTreeMap<String, String>) -> GatewayResult<()> {
        let req = proto::SetModelMetadataRequest {
            model_id: model_id.to_owned(),
            metadata,
        };
        self.logged("SetModelMetadata", self.client().set_model_metadata(self.request(req)).await)?;
        Ok(())
    }

    async fn get_model_metadata(&self, model_id: &str) -> GatewayResult<BTreeMap<String, String>> {
        let req = proto::GetModelMetadataRequest {
            model_id: model_id.to_owned(),
        };
        let resp = self.logged(
            "GetModelMetadata",
            self.client().get_model_metadata(self.request(req)).await,
        )?;
        Ok(resp.metadata)
    }

    async fn record_model_version(&self, req: RecordModelVersionRequest) -> GatewayResult<ModelVersion> {
        let resp = self.logged(
            "RecordModelVersion",
            self.client().record_model_version(self.request(req)).await,
        )?;
        self.require("RecordModelVersion", "version", resp.record)
    }

    async fn list_model_versions(&self, model_id: &str) -> GatewayResult<Vec<ModelVersion>> {
        let req = proto::ListModelVersionsRequest {
            model_id: model_id.to_owned(),
        };
        let resp = self.logged(
            "ListModelVersions",
            self.client().list_model_versions(self.request(req)).await,
        )?;
        Ok(resp.versions)
    }
}

#[cfg(test)]
mod test {
    use std::{net::SocketAddr, sync::Arc};

    use model_registry::{
        repository::InMemoryModelRepository, rpc::ModelRegistryRpc, service::RegistryService,
    };
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;

    use super::*;

    async fn serve() -> SocketAddr {
        let telemetry = Telemetry::detached();
        let repo = Arc::new(InMemoryModelRepository::new());
        let service = Arc::new(RegistryService::new(repo, telemetry.clone()));
        let rpc = ModelRegistryRpc::new(service, telemetry);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(rpc.into_server())
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .unwrap();
        });
        addr
    }

    async fn gateway() -> (GrpcGateway, Telemetry) {
        let addr = serve().await;
        let telemetry = Telemetry::detached();
        let config = GatewayConfig::with_endpoint(format!("http://{addr}"));
        let gateway = GrpcGateway::connect(&config, telemetry.clone()).await.unwrap();
        (gateway, telemetry)
    }

    fn bert() -> CreateModelRequest {
        CreateModelRequest {
            name: "bert-base".into(),
            version: "1.0.0".into(),
            framework: "pytorch".into(),
            tags: vec!["nlp".into()],
            owner_id: "alice".into(),
            tenant_id: "acme".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn round_trip_through_the_registry() {
        let (gateway, _) = gateway().await;
        let model = gateway.create_model(bert()).await.unwrap();
        assert_eq!(model.status, "pending");

        let fetched = gateway.get_model(&model.id).await.unwrap();
        assert_eq!(fetched.name, "bert-base");
        assert_eq!(fetched.tags, vec!["nlp".to_string()]);

        let updated = gateway.update_model_status(&model.id, "ready").await.unwrap();
        assert_eq!(updated.status, "ready");

        gateway
            .set_model_metadata(&model.id, BTreeMap::from([("k".to_string(), "v".to_string())]))
            .await
            .unwrap();
        assert_eq!(gateway.get_model_metadata(&model.id).await.unwrap().len(), 1);

        let (models, total) = gateway.list_models(ListModelsRequest::default()).await.unwrap();
        assert_eq!((models.len(), total), (1, 1));

        gateway.delete_model(&model.id).await.unwrap();
        let status = gateway.get_model(&model.id).await.unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn status_codes_pass_through() {
        let (gateway, telemetry) = gateway().await;
        let mut req = bert();
        req.version = String::new();
        assert_eq!(
            gateway.create_model(req).await.unwrap_err().code(),
            Code::Internal
        );

        let mut req = bert();
        req.framework = "jax".into();
        assert_eq!(
            gateway.create_model(req).await.unwrap_err().code(),
            Code::Internal
        );

        gateway.create_model(bert()).await.unwrap();
        let status = gateway.create_model(bert()).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);

        let status = gateway.delete_model("not-a-uuid").await.unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        let snapshot = telemetry.metrics().snapshot();
        assert_eq!(snapshot.internal_errors, 3);
        assert_eq!(snapshot.not_found, 1);
        assert_eq!(snapshot.models_created, 0);
    }

    #[tokio::test]
    async fn call_timeout_travels_as_grpc_timeout() {
        let (gateway, _) = gateway().await;
        let req = proto::GetModelRequest { id: "x".into() };
        assert!(gateway.request(req.clone()).metadata().get("grpc-timeout").is_none());

        let gateway = gateway.with_call_timeout(Duration::from_secs(2));
        assert!(gateway.request(req).metadata().get("grpc-timeout").is_some());

        let model = gateway.create_model(bert()).await.unwrap();
        assert_eq!(gateway.get_model(&model.id).await.unwrap().id, model.id);
    }

    #[tokio::test]
    async fn unreachable_registry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = GatewayConfig {
            connect_timeout: Duration::from_millis(200),
            ..GatewayConfig::with_endpoint(format!("http://{addr}"))
        };
        let telemetry = Telemetry::detached();
        assert!(GrpcGateway::connect(&config, telemetry.clone()).await.is_err());

        let lazy = GrpcGateway::connect_lazy(&config, telemetry.clone()).unwrap();
        assert!(lazy.get_model("anything").await.is_err());
        assert_eq!(telemetry.metrics().snapshot().internal_errors, 1);

        let bad = GatewayConfig::with_endpoint("not a uri");
        assert!(GrpcGateway::connect_lazy(&bad, telemetry).is_err());
    }
}
