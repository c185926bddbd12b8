use serde::{Deserialize, Serialize};

use crate::mail::OutgoingEmail;

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    /// Recipient display name; empty sends to the bare address.
    pub name: String,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl From<SendEmailRequest> for OutgoingEmail {
    fn from(request: SendEmailRequest) -> Self {
        OutgoingEmail {
            to: request.to,
            name: request.name,
            subject: request.subject,
            html: request.html,
            text: request.text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
