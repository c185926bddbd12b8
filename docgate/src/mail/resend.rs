use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{EmailError, EmailTransport, OutgoingEmail, Sender};

/// Sends through Resend's HTTP API.
#[derive(Debug, Clone)]
pub struct ResendTransport {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: String,
    to: Vec<String>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

impl ResendTransport {
    pub fn new(api_key: &str, api_url: &str) -> Result<Self, EmailError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, from: &Sender, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        let request = SendRequest {
            from: from.mailbox()?.to_string(),
            to: vec![email.recipient()?.to_string()],
            subject: &email.subject,
            html: &email.html,
            text: email.text.as_deref(),
        };

        let response = self.http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<SendResponse>()
                .await
                .map_err(|e| EmailError::Transport(e.to_string()))?;

            return Ok(body.id);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EmailError::Authentication(message)),
            _ => Err(EmailError::Transport(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    /// Serves a fake provider endpoint on an ephemeral port and returns its URL.
    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{addr}/emails")
    }

    fn sender() -> Sender {
        Sender { name: "LMS".into(), address: "onboarding@resend.dev".into() }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "ana@example.com".into(),
            name: "Ana".into(),
            subject: "Welcome".into(),
            html: "<p>Hi</p>".into(),
            text: None,
        }
    }

    #[tokio::test]
    async fn posts_the_message_and_returns_the_provider_id() {
        let seen = Arc::new(Mutex::new(None::<(Option<String>, Value)>));
        let captured = seen.clone();

        let url = spawn_provider(Router::new().route(
            "/emails",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *captured.lock().unwrap() = Some((auth, body));
                    Json(json!({ "id": "re_msg_1" }))
                }
            }),
        ))
        .await;

        let transport = ResendTransport::new("re_key", &url).unwrap();
        let id = transport.send(&sender(), &email()).await.unwrap();

        assert_eq!(id.as_deref(), Some("re_msg_1"));

        let (auth, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer re_key"));
        assert_eq!(
            body,
            json!({
                "from": "LMS <onboarding@resend.dev>",
                "to": ["Ana <ana@example.com>"],
                "subject": "Welcome",
                "html": "<p>Hi</p>",
            })
        );
    }

    #[tokio::test]
    async fn rejected_credentials_are_authentication_errors() {
        let url = spawn_provider(Router::new().route(
            "/emails",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(json!({ "statusCode": 401, "message": "API key is invalid" })),
                )
            }),
        ))
        .await;

        let err = ResendTransport::new("bad", &url)
            .unwrap()
            .send(&sender(), &email())
            .await
            .unwrap_err();

        match err {
            EmailError::Authentication(message) => assert_eq!(message, "API key is invalid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_failures_are_transport_errors() {
        let url = spawn_provider(Router::new().route(
            "/emails",
            post(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let err = ResendTransport::new("re_key", &url)
            .unwrap()
            .send(&sender(), &email())
            .await
            .unwrap_err();

        assert!(matches!(err, EmailError::Transport(_)));
    }
}
