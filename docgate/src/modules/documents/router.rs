use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{count, delete_one, find, find_one, insert_many, insert_one, update_one};

pub fn init_documents_router() -> Router<AppState> {
    Router::new()
        .route("/find", post(find))
        .route("/findOne", post(find_one))
        .route("/insertOne", post(insert_one))
        .route("/insertMany", post(insert_many))
        .route("/updateOne", post(update_one))
        .route("/deleteOne", post(delete_one))
        .route("/count", post(count))
}
