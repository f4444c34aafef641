use tonic_build::manual::{Builder, Method, Service};

/// (generated method name, RPC route name, request message, response message)
const METHODS: &[(&str, &str, &str, &str)] = &[
    ("create_model", "CreateModel", "CreateModelRequest", "CreateModelResponse"),
    ("get_model", "GetModel", "GetModelRequest", "GetModelResponse"),
    (
        "get_model_by_name_and_version",
        "GetModelByNameAndVersion",
        "GetModelByNameAndVersionRequest",
        "GetModelResponse",
    ),
    ("list_models", "ListModels", "ListModelsRequest", "ListModelsResponse"),
    ("update_model", "UpdateModel", "UpdateModelRequest", "UpdateModelResponse"),
    (
        "update_model_status",
        "UpdateModelStatus",
        "UpdateModelStatusRequest",
        "UpdateModelStatusResponse",
    ),
    ("delete_model", "DeleteModel", "DeleteModelRequest", "Empty"),
    ("add_model_tags", "AddModelTags", "AddModelTagsRequest", "Empty"),
    ("remove_model_tags", "RemoveModelTags", "RemoveModelTagsRequest", "Empty"),
    ("set_model_metadata", "SetModelMetadata", "SetModelMetadataRequest", "Empty"),
    (
        "get_model_metadata",
        "GetModelMetadata",
        "GetModelMetadataRequest",
        "GetModelMetadataResponse",
    ),
    (
        "record_model_version",
        "RecordModelVersion",
        "RecordModelVersionRequest",
        "RecordModelVersionResponse",
    ),
    (
        "list_model_versions",
        "ListModelVersions",
        "ListModelVersionsRequest",
        "ListModelVersionsResponse",
    ),
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Messages live in src/rpc/proto.rs; only the client and server stubs are generated.
    let service = METHODS
        .iter()
        .fold(
            Service::builder().name("ModelRegistry").package("registry.v1"),
            |service, (name, route, input, output)| {
                service.method(
                    Method::builder()
                        .name(*name)
                        .route_name(*route)
                        .input_type(format!("crate::rpc::proto::{input}"))
                        .output_type(format!("crate::rpc::proto::{output}"))
                        .codec_path("tonic::codec::ProstCodec")
                        .build(),
                )
            },
        )
        .build();

    Builder::new().compile(&[service]);
}
