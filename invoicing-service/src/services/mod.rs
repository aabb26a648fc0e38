//! Services module for invoicing-service.

pub mod accounts;
pub mod assistant;
pub mod auth;
pub mod database;
pub mod invoice_service;
pub mod jwt;
pub mod metrics;
pub mod normalizer;
pub mod providers;
pub mod repository;
pub mod validator;

pub use accounts::{AccountError, AccountService, Session};
pub use assistant::{AiAssistant, AssistantError, Insights, Reminder};
pub use auth::{AuthError, AuthVerifier, JwtAuthVerifier};
pub use database::{MongoDb, MongoInvoiceRepository, MongoUserRepository};
pub use invoice_service::InvoiceService;
pub use jwt::{Claims, JwtService};
pub use repository::{
    InMemoryInvoiceRepository, InMemoryUserRepository, InvoiceRepository, UserRepository,
};
