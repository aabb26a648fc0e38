use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_optional_env, is_production};
use service_core::error::AppError;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub genai: GenAiConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_days: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"***")
            .field("expiry_days", &self.expiry_days)
            .finish()
    }
}

/// Gemini settings. Without an API key the AI routes answer 501.
#[derive(Clone, Deserialize)]
pub struct GenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = is_production();

        Ok(InvoicingConfig {
            common,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("invoice_db"), is_prod)?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", None, is_prod)?,
                expiry_days: parse("JWT_EXPIRY_DAYS", get_env("JWT_EXPIRY_DAYS", Some("30"), is_prod)?)?,
            },
            genai: GenAiConfig {
                api_key: get_optional_env("GEMINI_API_KEY"),
                model: get_env("GEMINI_MODEL", Some("gemini-1.5-pro"), is_prod)?,
                timeout_secs: parse(
                    "GENAI_TIMEOUT_SECS",
                    get_env("GENAI_TIMEOUT_SECS", Some("30"), is_prod)?,
                )?,
            },
            observability: ObservabilityConfig {
                log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
                otlp_endpoint: get_optional_env("OTEL_EXPORTER_OTLP_ENDPOINT"),
            },
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: String) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{} is not valid ({}): {}", key, raw, e)))
}
