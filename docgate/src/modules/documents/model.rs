use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

#[derive(Debug, Deserialize)]
pub struct FindRequest {
    pub collection: String,
    #[serde(default)]
    pub filter: Option<JsonObject>,
    /// `{field: direction}` in priority order.
    #[serde(default)]
    pub sort: Option<JsonObject>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

/// Body shared by `findOne` and `count`.
#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub collection: String,
    #[serde(default)]
    pub filter: Option<JsonObject>,
}

#[derive(Debug, Deserialize)]
pub struct InsertOneRequest {
    pub collection: String,
    pub document: JsonObject,
}

#[derive(Debug, Deserialize)]
pub struct InsertManyRequest {
    pub collection: String,
    pub documents: Vec<JsonObject>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOneRequest {
    pub collection: String,
    pub id: String,
    pub update: JsonObject,
}

#[derive(Debug, Deserialize)]
pub struct DeleteOneRequest {
    pub collection: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResponse {
    pub inserted_id: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResponse {
    pub inserted_ids: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOneResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}
