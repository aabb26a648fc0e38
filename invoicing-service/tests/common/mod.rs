//! Shared harness: the full router over in-memory stores and a scripted
//! text generator.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use invoicing_service::config::JwtConfig;
use invoicing_service::services::providers::{MockTextGenerator, TextGenerator};
use invoicing_service::services::{
    AccountService, AiAssistant, AuthVerifier, InMemoryInvoiceRepository,
    InMemoryUserRepository, InvoiceService, JwtAuthVerifier, JwtService,
};
use invoicing_service::startup::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub generator: Arc<MockTextGenerator>,
    pub invoices: Arc<InMemoryInvoiceRepository>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_generator(MockTextGenerator::new(), Duration::from_secs(5))
    }

    pub fn with_generator(generator: MockTextGenerator, timeout: Duration) -> Self {
        let generator = Arc::new(generator);
        let (state, invoices) = Self::state(Some((generator.clone(), timeout)));
        Self {
            router: build_router(state),
            generator,
            invoices,
        }
    }

    /// App with no text generator configured.
    pub fn without_ai() -> Self {
        let (state, invoices) = Self::state(None);
        Self {
            router: build_router(state),
            generator: Arc::new(MockTextGenerator::new()),
            invoices,
        }
    }

    fn state(
        generator: Option<(Arc<MockTextGenerator>, Duration)>,
    ) -> (AppState, Arc<InMemoryInvoiceRepository>) {
        let invoice_repo = Arc::new(InMemoryInvoiceRepository::new());
        let user_repo = Arc::new(InMemoryUserRepository::new());
        let jwt = JwtService::new(&JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expiry_days: 1,
        });

        let invoices = InvoiceService::new(invoice_repo.clone());
        let accounts = AccountService::new(user_repo.clone(), jwt.clone());
        let auth: Arc<dyn AuthVerifier> = Arc::new(JwtAuthVerifier::new(jwt, user_repo));
        let assistant = generator.map(|(generator, timeout)| {
            let generator: Arc<dyn TextGenerator> = generator;
            AiAssistant::new(generator, invoices.clone(), timeout)
        });

        let state = AppState {
            invoices,
            accounts,
            auth,
            assistant,
        };
        (state, invoice_repo)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("Failed to build request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }

    /// Register a user and return their session token.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        response.body["token"]
            .as_str()
            .expect("Missing token")
            .to_string()
    }

    pub async fn create_invoice(&self, token: &str, payload: Value) -> TestResponse {
        self.request(Method::POST, "/api/invoices", Some(token), Some(payload))
            .await
    }
}

/// The canonical create payload: two designs at 100 with 10% tax.
pub fn sample_invoice(invoice_number: &str) -> Value {
    json!({
        "invoiceNumber": invoice_number,
        "invoiceDate": "2024-01-01",
        "dueDate": "2024-01-31",
        "billingFrom": { "businessName": "Acme" },
        "billingTo": { "clientName": "Bob" },
        "items": [
            { "name": "Design", "quantity": 2, "unitPrice": 100, "taxPercent": 10 }
        ]
    })
}
