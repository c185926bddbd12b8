use axum::{Json, extract::State};
use tracing::instrument;

use crate::{
    error::{ApiError, ApiJson},
    mail::OutgoingEmail,
    state::AppState,
};

use super::model::{SendEmailRequest, SendEmailResponse};

#[instrument(skip_all, fields(to = %request.to))]
pub async fn send_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let email = OutgoingEmail::from(request);

    let id = state.mailer.send(&email).await?;

    Ok(Json(SendEmailResponse {
        success: true,
        message: format!("Email sent to {}", email.to),
        id,
    }))
}
