use crate::config::InvoicingConfig;
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::providers::{GeminiConfig, GeminiTextGenerator, TextGenerator};
use crate::services::{
    AccountService, AiAssistant, AuthVerifier, InvoiceService, JwtAuthVerifier, JwtService,
    MongoDb, MongoInvoiceRepository, MongoUserRepository,
};
use axum::{
    body::Body,
    http::{header, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub invoices: InvoiceService,
    pub accounts: AccountService,
    pub auth: Arc<dyn AuthVerifier>,
    /// `None` when no text generator is configured.
    pub assistant: Option<AiAssistant>,
}

/// Routes and layers, independent of how the state was assembled.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::me).put(handlers::update_me))
        .route(
            "/api/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route("/api/ai/parse-invoice", post(handlers::parse_invoice))
        .route("/api/ai/generate-reminder", post(handlers::generate_reminder))
        .route("/api/ai/dashboard-summary", get(handlers::dashboard_summary))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/api/invoices/exists/:invoice_number",
            get(handlers::check_invoice_number),
        )
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .merge(protected)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        }))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        // Connects on first use; see `MongoDb::database`.
        let db = MongoDb::new(&config.mongodb.uri, &config.mongodb.database);
        let invoice_repo = Arc::new(MongoInvoiceRepository::new(db.clone()));
        let user_repo = Arc::new(MongoUserRepository::new(db));

        let jwt = JwtService::new(&config.jwt);
        let invoices = InvoiceService::new(invoice_repo);
        let accounts = AccountService::new(user_repo.clone(), jwt.clone());
        let auth: Arc<dyn AuthVerifier> = Arc::new(JwtAuthVerifier::new(jwt, user_repo));

        let timeout = Duration::from_secs(config.genai.timeout_secs);
        let assistant = match &config.genai.api_key {
            Some(api_key) => {
                let generator = GeminiTextGenerator::new(GeminiConfig {
                    api_key: api_key.clone(),
                    model: config.genai.model.clone(),
                    timeout,
                })
                .map_err(|e| {
                    tracing::error!("Failed to initialize Gemini client: {}", e);
                    AppError::ConfigError(e)
                })?;
                tracing::info!(model = %config.genai.model, "AI assistant enabled");
                let generator: Arc<dyn TextGenerator> = Arc::new(generator);
                Some(AiAssistant::new(generator, invoices.clone(), timeout))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set, AI routes will answer 501");
                None
            }
        };

        let state = AppState {
            invoices,
            accounts,
            auth,
            assistant,
        };

        Self::serve(state, config.common.port).await
    }

    /// Bind `port` (0 picks a free one) and serve the router over `state`.
    pub async fn serve(state: AppState, port: u16) -> Result<Self, AppError> {
        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
