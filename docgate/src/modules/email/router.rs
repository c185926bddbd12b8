use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::send_email;

pub fn init_email_router() -> Router<AppState> {
    Router::new().route("/send-email", post(send_email))
}
