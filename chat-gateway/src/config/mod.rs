use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Model used when `CHAT_MODEL_ID` is not set.
pub const DEFAULT_MODEL_ID: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Hosted inference endpoint; the model id is appended as a path segment.
pub const DEFAULT_INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";

const DEFAULT_INFERENCE_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 15 * 60;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub serve_mode: ServeMode,
    /// `PORT` injected by the hosting platform; only honoured when hosted.
    pub platform_port: Option<u16>,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub inference: InferenceConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" | "test" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("Unknown ENVIRONMENT '{}': expected dev or prod", other)),
        }
    }
}

/// How the process is deployed.
///
/// `Hosted` sits behind a platform router that injects `PORT` and expects the
/// service on every interface; `Local` is a developer machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    Hosted,
    Local,
}

impl ServeMode {
    fn default_host(self) -> &'static str {
        match self {
            ServeMode::Hosted => "0.0.0.0",
            ServeMode::Local => "127.0.0.1",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            ServeMode::Hosted => 10000,
            ServeMode::Local => 3000,
        }
    }
}

impl FromStr for ServeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hosted" => Ok(ServeMode::Hosted),
            "local" => Ok(ServeMode::Local),
            other => Err(format!("Unknown SERVE_MODE '{}': expected hosted or local", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub model_id: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl GatewayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let serve_mode: ServeMode = get_env("SERVE_MODE", Some("hosted"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let platform_port = match (serve_mode, env::var("PORT")) {
            (ServeMode::Hosted, Ok(raw)) => Some(raw.parse().map_err(|_| {
                AppError::ConfigError(anyhow::anyhow!("PORT has an invalid value: {}", raw))
            })?),
            _ => None,
        };

        Ok(GatewayConfig {
            common,
            environment,
            serve_mode,
            platform_port,
            service_name: get_env("SERVICE_NAME", Some("chat-gateway"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            inference: InferenceConfig {
                api_key: Secret::new(get_env("HUGGINGFACE_API_KEY", None, is_prod)?),
                api_base: get_env("INFERENCE_API_BASE", Some(DEFAULT_INFERENCE_API_BASE), is_prod)?,
                model_id: get_env("CHAT_MODEL_ID", Some(DEFAULT_MODEL_ID), is_prod)?,
                timeout_seconds: parse_env(
                    "INFERENCE_TIMEOUT_SECONDS",
                    DEFAULT_INFERENCE_TIMEOUT_SECONDS,
                    is_prod,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&get_env("CORS_ORIGIN", Some("*"), is_prod)?),
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_env(
                    "RATE_LIMIT_MAX_REQUESTS",
                    DEFAULT_RATE_LIMIT_MAX_REQUESTS,
                    is_prod,
                )?,
                window_seconds: parse_env(
                    "RATE_LIMIT_WINDOW_SECONDS",
                    DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
                    is_prod,
                )?,
            },
        })
    }

    /// Bind host: `APP__HOST`, else the serve-mode default.
    pub fn host(&self) -> &str {
        self.common
            .host
            .as_deref()
            .unwrap_or_else(|| self.serve_mode.default_host())
    }

    /// Bind port: `APP__PORT`, then the platform's `PORT` when hosted, then
    /// the serve-mode default.
    pub fn port(&self) -> u16 {
        if let Some(port) = self.common.port {
            return port;
        }
        match (self.serve_mode, self.platform_port) {
            (ServeMode::Hosted, Some(port)) => port,
            (mode, _) => mode.default_port(),
        }
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T: FromStr>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: ToString,
{
    let raw = get_env(key, Some(&default.to_string()), is_prod)?;
    raw.parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, raw))
    })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
