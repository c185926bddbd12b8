use axum::{Json, extract::State};
use docgate_core::{
    backend::UpdateOutcome,
    convert::{bson_to_json, json_object_to_document},
    query::FindOptions,
};
use serde_json::Value;
use tracing::instrument;

use crate::{
    error::{ApiError, ApiJson},
    state::AppState,
};

use super::model::{
    CountResponse, DataResponse, DeleteOneRequest, DeleteOneResponse, FilterRequest, FindRequest,
    InsertManyRequest, InsertManyResponse, InsertOneRequest, InsertOneResponse, UpdateOneRequest,
};

#[instrument(skip_all, fields(collection = %request.collection))]
pub async fn find(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FindRequest>,
) -> Result<Json<DataResponse<Vec<Value>>>, ApiError> {
    let collection = state.store.collection(&request.collection)?;
    let options = FindOptions::from_request(request.sort, request.skip, request.limit)?;
    let filter = json_object_to_document(request.filter.unwrap_or_default());

    let documents = collection.find(filter, options).await?;

    Ok(Json(DataResponse {
        data: documents.into_iter().map(bson_to_json).collect(),
    }))
}

#[instrument(skip_all, fields(collection = %request.collection))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilterRequest>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let collection = state.store.collection(&request.collection)?;
    let filter = json_object_to_document(request.filter.unwrap_or_default());

    let document = collection.find_one(filter).await?;

    Ok(Json(DataResponse { data: bson_to_json(document) }))
}

#[instrument(skip_all, fields(collection = %request.collection))]
pub async fn insert_one(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InsertOneRequest>,
) -> Result<Json<InsertOneResponse>, ApiError> {
    let collection = state.store.collection(&request.collection)?;

    let inserted_id = collection
        .insert_one(json_object_to_document(request.document))
        .await?;

    Ok(Json(InsertOneResponse { inserted_id: bson_to_json(inserted_id) }))
}

#[instrument(skip_all, fields(collection = %request.collection, documents = request.documents.len()))]
pub async fn insert_many(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InsertManyRequest>,
) -> Result<Json<InsertManyResponse>, ApiError> {
    let collection = state.store.collection(&request.collection)?;
    let documents = request.documents
        .into_iter()
        .map(json_object_to_document)
        .collect();

    let inserted_ids = collection.insert_many(documents).await?;

    Ok(Json(InsertManyResponse {
        inserted_ids: inserted_ids.into_iter().map(bson_to_json).collect(),
    }))
}

#[instrument(skip_all, fields(collection = %request.collection, id = %request.id))]
pub async fn update_one(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateOneRequest>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let collection = state.store.collection(&request.collection)?;

    let outcome = collection
        .update_one(&request.id, json_object_to_document(request.update))
        .await?;

    Ok(Json(outcome))
}

#[instrument(skip_all, fields(collection = %request.collection))]
pub async fn delete_one(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteOneRequest>,
) -> Result<Json<DeleteOneResponse>, ApiError> {
    let collection = state.store.collection(&request.collection)?;

    let deleted_count = collection.delete_one(&request.id).await?;

    Ok(Json(DeleteOneResponse { deleted_count }))
}

#[instrument(skip_all, fields(collection = %request.collection))]
pub async fn count(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilterRequest>,
) -> Result<Json<CountResponse>, ApiError> {
    let collection = state.store.collection(&request.collection)?;
    let filter = json_object_to_document(request.filter.unwrap_or_default());

    let count = collection.count(filter).await?;

    Ok(Json(CountResponse { count }))
}
