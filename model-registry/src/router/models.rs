use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    api_types::{
        CreateModelBody, ListModelsQuery, ListModelsResponse, ListVersionsResponse, MetadataBody,
        ModelBody, RecordVersionBody, TagsBody, UpdateModelBody, UpdateStatusBody, VersionBody,
    },
    entity::ModelStatus,
    error::parse_model_id,
    router::ApiError,
    state::AppState,
};

type ApiResult<T> = Result<T, ApiError>;

pub async fn create_model(
    State(AppState { service, .. }): State<AppState>,
    payload: Result<Json<CreateModelBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ModelBody>)> {
    let Json(body) = payload?;
    let model = service.create_model(body.into_request()?).await?;
    Ok((StatusCode::CREATED, Json(model.into())))
}

pub async fn get_model(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ModelBody>> {
    let model = service.get_model(parse_model_id(&id)?).await?;
    Ok(Json(model.into()))
}

pub async fn lookup_model(
    State(AppState { service, .. }): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> ApiResult<Json<ModelBody>> {
    let model = service.get_model_by_name_and_version(&name, &version).await?;
    Ok(Json(model.into()))
}

pub async fn list_models(
    State(AppState { service, .. }): State<AppState>,
    query: Result<Query<ListModelsQuery>, QueryRejection>,
) -> ApiResult<Json<ListModelsResponse>> {
    let Query(query) = query?;
    let (filter, pagination) = query.into_filter()?;
    let page = service.list_models(filter, pagination).await?;
    Ok(Json(page.into()))
}

pub async fn update_model(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateModelBody>, JsonRejection>,
) -> ApiResult<Json<ModelBody>> {
    let Json(body) = payload?;
    let id = parse_model_id(&id)?;
    let model = service.update_model(id, body.into_request()?).await?;
    Ok(Json(model.into()))
}

/// Answers 200 with an empty body.
pub async fn update_model_status(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = payload?;
    let status: ModelStatus = body.status.trim().parse()?;
    service.update_model_status(parse_model_id(&id)?, status).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_model(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_model(parse_model_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_model_tags(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TagsBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = payload?;
    service.add_model_tags(parse_model_id(&id)?, body.tags).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_model_tags(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TagsBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = payload?;
    service.remove_model_tags(parse_model_id(&id)?, body.tags).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_model_metadata(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MetadataBody>> {
    let metadata = service.get_model_metadata(parse_model_id(&id)?).await?;
    Ok(Json(MetadataBody { metadata }))
}

pub async fn set_model_metadata(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MetadataBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = payload?;
    service
        .set_model_metadata(parse_model_id(&id)?, body.metadata)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_model_version(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RecordVersionBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VersionBody>)> {
    let Json(body) = payload?;
    let id = parse_model_id(&id)?;
    let version = service.record_model_version(id, body.into_request()?).await?;
    Ok((StatusCode::CREATED, Json(version.into())))
}

pub async fn list_model_versions(
    State(AppState { service, .. }): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ListVersionsResponse>> {
    let versions = service.list_model_versions(parse_model_id(&id)?).await?;
    Ok(Json(ListVersionsResponse {
        versions: versions.into_iter().map(VersionBody::from).collect(),
    }))
}
