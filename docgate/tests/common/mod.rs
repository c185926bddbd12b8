#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use docgate::{
    AppState,
    backend::{StoreBackend, UpdateOutcome},
    bson::{Bson, Document, oid::ObjectId},
    init_router,
    mail::{EmailError, EmailTransport, Mailer, OutgoingEmail, Sender},
    memory::InMemoryStore,
    query::FindOptions,
    store::DocumentStore,
};
use docgate_core::error::{StoreError, StoreResult};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const COURSE_ID: &str = "507f1f77bcf86cd799439011";

pub fn sender() -> Sender {
    Sender {
        name: "LMS".into(),
        address: "onboarding@resend.dev".into(),
    }
}

/// What a [`StubTransport`] answers to every send.
#[derive(Debug, Clone)]
pub enum StubReply {
    Delivered(Option<String>),
    RejectCredentials,
    Fail,
}

/// Records messages instead of delivering them.
#[derive(Debug)]
pub struct StubTransport {
    reply: StubReply,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl StubTransport {
    pub fn new(reply: StubReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl EmailTransport for StubTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, _: &Sender, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        self.sent.lock().unwrap().push(email.clone());

        match &self.reply {
            StubReply::Delivered(id) => Ok(id.clone()),
            StubReply::RejectCredentials => Err(EmailError::Authentication("API key is invalid".into())),
            StubReply::Fail => Err(EmailError::Transport("connection reset".into())),
        }
    }
}

/// A backend whose every call fails, standing in for an unreachable database.
#[derive(Debug)]
pub struct UnreachableBackend;

fn refused<T>() -> StoreResult<T> {
    Err(StoreError::Backend("connection refused".into()))
}

#[async_trait]
impl StoreBackend for UnreachableBackend {
    async fn find(&self, _: &str, _: Document, _: FindOptions) -> StoreResult<Vec<Document>> {
        refused()
    }

    async fn find_one(&self, _: &str, _: Document) -> StoreResult<Option<Document>> {
        refused()
    }

    async fn insert_one(&self, _: &str, _: Document) -> StoreResult<Bson> {
        refused()
    }

    async fn insert_many(&self, _: &str, _: Vec<Document>) -> StoreResult<Vec<Bson>> {
        refused()
    }

    async fn update_one(&self, _: &str, _: ObjectId, _: Document) -> StoreResult<UpdateOutcome> {
        refused()
    }

    async fn delete_one(&self, _: &str, _: ObjectId) -> StoreResult<u64> {
        refused()
    }

    async fn count(&self, _: &str, _: Document) -> StoreResult<u64> {
        refused()
    }

    async fn ping(&self) -> StoreResult<()> {
        refused()
    }
}

pub fn app_with(store: DocumentStore, mailer: Mailer) -> Router {
    init_router(AppState::new(store, mailer, "test"))
}

/// An app over an empty in-memory store with email disabled.
pub fn setup_test_app() -> Router {
    app_with(DocumentStore::new(InMemoryStore::default()), Mailer::disabled(sender()))
}

pub fn setup_test_app_with_transport(transport: Arc<StubTransport>) -> Router {
    let mailer = Mailer::new(Some(transport as Arc<dyn EmailTransport>), sender());
    app_with(DocumentStore::new(InMemoryStore::default()), mailer)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, body)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

pub fn detail(body: &Value) -> &str {
    body["detail"].as_str().unwrap_or_default()
}
