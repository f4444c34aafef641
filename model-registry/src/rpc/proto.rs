//! Wire messages of the `registry.v1.ModelRegistry` service.
//!
//! Messages are declared by hand with prost derives; the service client and server stubs are
//! generated by `build.rs` and included at the bottom of this module.

use std::collections::BTreeMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Model {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(string, tag = "4")]
    pub version: String,
    #[prost(string, tag = "5")]
    pub framework: String,
    #[prost(string, tag = "6")]
    pub status: String,
    #[prost(int64, tag = "7")]
    pub size: i64,
    #[prost(string, tag = "8")]
    pub checksum: String,
    #[prost(string, tag = "9")]
    pub storage_path: String,
    #[prost(string, tag = "10")]
    pub docker_image: String,
    #[prost(string, repeated, tag = "11")]
    pub tags: Vec<String>,
    #[prost(btree_map = "string, string", tag = "12")]
    pub metadata: BTreeMap<String, String>,
    #[prost(string, tag = "13")]
    pub owner_id: String,
    #[prost(string, tag = "14")]
    pub tenant_id: String,
    #[prost(bool, tag = "15")]
    pub is_public: bool,
    #[prost(message, optional, tag = "16")]
    pub created_at: Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "17")]
    pub updated_at: Option<::prost_types::Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelVersion {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub model_id: String,
    #[prost(string, tag = "3")]
    pub version: String,
    #[prost(string, tag = "4")]
    pub status: String,
    #[prost(int64, tag = "5")]
    pub size: i64,
    #[prost(string, tag = "6")]
    pub checksum: String,
    #[prost(string, tag = "7")]
    pub storage_path: String,
    #[prost(string, tag = "8")]
    pub docker_image: String,
    #[prost(string, tag = "9")]
    pub change_log: String,
    #[prost(string, tag = "10")]
    pub created_by: String,
    #[prost(message, optional, tag = "11")]
    pub created_at: Option<::prost_types::Timestamp>,
}

/// Empty acknowledgement.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Empty {}

/// Wrapper so an update can tell an absent tag list from an empty one.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TagList {
    #[prost(string, repeated, tag = "1")]
    pub tags: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetadataMap {
    #[prost(btree_map = "string, string", tag = "1")]
    pub entries: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateModelRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub version: String,
    #[prost(string, tag = "4")]
    pub framework: String,
    #[prost(string, repeated, tag = "5")]
    pub tags: Vec<String>,
    #[prost(btree_map = "string, string", tag = "6")]
    pub metadata: BTreeMap<String, String>,
    #[prost(string, tag = "7")]
    pub owner_id: String,
    #[prost(string, tag = "8")]
    pub tenant_id: String,
    #[prost(bool, tag = "9")]
    pub is_public: bool,
    #[prost(int64, tag = "10")]
    pub size: i64,
    #[prost(string, tag = "11")]
    pub checksum: String,
    #[prost(string, tag = "12")]
    pub storage_path: String,
    #[prost(string, tag = "13")]
    pub docker_image: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateModelResponse {
    #[prost(message, optional, tag = "1")]
    pub model: Option<Model>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModelRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModelByNameAndVersionRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModelResponse {
    #[prost(message, optional, tag = "1")]
    pub model: Option<Model>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListModelsRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub framework: String,
    #[prost(string, tag = "3")]
    pub status: String,
    #[prost(string, tag = "4")]
    pub owner_id: String,
    #[prost(string, tag = "5")]
    pub tenant_id: String,
    #[prost(bool, optional, tag = "6")]
    pub is_public: Option<bool>,
    #[prost(string, repeated, tag = "7")]
    pub tags: Vec<String>,
    #[prost(int32, tag = "8")]
    pub page: i32,
    #[prost(int32, tag = "9")]
    pub limit: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListModelsResponse {
    #[prost(message, repeated, tag = "1")]
    pub models: Vec<Model>,
    #[prost(int64, tag = "2")]
    pub total: i64,
    #[prost(int32, tag = "3")]
    pub page: i32,
    #[prost(int32, tag = "4")]
    pub limit: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateModelRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub description: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub is_public: Option<bool>,
    #[prost(int64, optional, tag = "5")]
    pub size: Option<i64>,
    #[prost(string, optional, tag = "6")]
    pub checksum: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub storage_path: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub docker_image: Option<String>,
    #[prost(message, optional, tag = "9")]
    pub tags: Option<TagList>,
    #[prost(message, optional, tag = "10")]
    pub metadata: Option<MetadataMap>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateModelResponse {
    #[prost(message, optional, tag = "1")]
    pub model: Option<Model>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateModelStatusRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub status: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateModelStatusResponse {
    #[prost(message, optional, tag = "1")]
    pub model: Option<Model>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteModelRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddModelTagsRequest {
    #[prost(string, tag = "1")]
    pub model_id: String,
    #[prost(string, repeated, tag = "2")]
    pub tags: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveModelTagsRequest {
    #[prost(string, tag = "1")]
    pub model_id: String,
    #[prost(string, repeated, tag = "2")]
    pub tags: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetModelMetadataRequest {
    #[prost(string, tag = "1")]
    pub model_id: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModelMetadataRequest {
    #[prost(string, tag = "1")]
    pub model_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModelMetadataResponse {
    #[prost(btree_map = "string, string", tag = "1")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecordModelVersionRequest {
    #[prost(string, tag = "1")]
    pub model_id: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(int64, optional, tag = "3")]
    pub size: Option<i64>,
    #[prost(string, optional, tag = "4")]
    pub checksum: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub storage_path: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub docker_image: Option<String>,
    #[prost(string, tag = "7")]
    pub change_log: String,
    #[prost(string, tag = "8")]
    pub created_by: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecordModelVersionResponse {
    #[prost(message, optional, tag = "1")]
    pub record: Option<ModelVersion>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListModelVersionsRequest {
    #[prost(string, tag = "1")]
    pub model_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListModelVersionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub versions: Vec<ModelVersion>,
}

include!(concat!(env!("OUT_DIR"), "/registry.v1.ModelRegistry.rs"));
