//! # Configuration
//!
//! Command-line arguments with environment fallbacks (clap `env`), and the
//! validated runtime configuration derived from them.

use axum::http::HeaderValue;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use thiserror::Error;

/// Lifetime of a user session token.
pub const USER_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Lifetime of an admin session token.
pub const ADMIN_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

// =============================================================================
// CLI
// =============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    version,
    about = "Feedback collection server with emotion classification"
)]
pub struct Cli {
    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Train the classifier from the corpus and write the model file
    Train {
        /// Overwrite an existing model file
        #[arg(long)]
        force: bool,
    },

    /// Classify a piece of text
    Predict {
        text: String,

        /// Print every label with its probability as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show store counts and model state
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Embedded redb database file
    Redb,
    /// Process memory; discarded on exit
    Memory,
}

#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Database file (redb backend)
    #[arg(long, env = "PULSE_DATABASE", default_value = "pulse.redb", global = true)]
    pub database: PathBuf,

    #[arg(long, value_enum, env = "PULSE_BACKEND", default_value = "redb", global = true)]
    pub backend: Backend,
}

#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Labelled CSV used to bootstrap the classifier
    #[arg(long, env = "PULSE_CORPUS", default_value = "data/EmotionDetection.csv", global = true)]
    pub corpus: PathBuf,

    /// Where the trained classifier is cached
    #[arg(long, env = "PULSE_MODEL", default_value = "data/classifier.json", global = true)]
    pub model: PathBuf,

    /// Maximum corpus rows to train on (0 = all)
    #[arg(long, env = "MODEL_TRAIN_LIMIT", default_value_t = 0, global = true)]
    pub train_limit: u64,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// HMAC secret for session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "ADMIN_USER")]
    pub admin_user: Option<String>,

    #[arg(long, env = "ADMIN_PASS", hide_env_values = true)]
    pub admin_pass: Option<String>,

    /// Allowed CORS origin; any origin when unset
    #[arg(long, env = "CLIENT_URL")]
    pub client_url: Option<String>,

    /// Sustained login attempts per second across all clients
    #[arg(long, default_value_t = 10)]
    pub login_rate: u32,

    #[arg(long, default_value_t = 20)]
    pub login_burst: u32,
}

// =============================================================================
// VALIDATED CONFIG
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,

    #[error("CLIENT_URL is not a valid header value: {0}")]
    InvalidClientUrl(String),

    #[error("login rate and burst must be greater than zero")]
    InvalidRateLimit,
}

/// Static administrator account. Absent fields disable admin login.
#[derive(Debug, Clone, Default)]
pub struct AdminCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_second: NonZeroU32,
    pub burst: NonZeroU32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
            burst: NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// HTTP-layer settings shared by the router builder.
#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
    pub client_origin: Option<HeaderValue>,
    pub login_rate: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub admin: AdminCredentials,
    pub http: HttpConfig,
}

/// Where the classifier comes from and how it is cached.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub corpus_path: PathBuf,
    pub model_path: PathBuf,
    /// `None` trains on the whole corpus.
    pub train_limit: Option<u64>,
    pub memo_size: usize,
}

impl From<&ModelArgs> for EngineConfig {
    fn from(args: &ModelArgs) -> Self {
        Self {
            corpus_path: args.corpus.clone(),
            model_path: args.model.clone(),
            train_limit: (args.train_limit > 0).then_some(args.train_limit),
            memo_size: pulse_core::cache::DEFAULT_CACHE_SIZE,
        }
    }
}

impl ServeArgs {
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let jwt_secret = self
            .jwt_secret
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let client_origin = self
            .client_url
            .filter(|u| !u.trim().is_empty())
            .map(|u| {
                HeaderValue::from_str(u.trim_end_matches('/'))
                    .map_err(|_| ConfigError::InvalidClientUrl(u.clone()))
            })
            .transpose()?;

        let login_rate = RateLimitConfig {
            per_second: NonZeroU32::new(self.login_rate).ok_or(ConfigError::InvalidRateLimit)?,
            burst: NonZeroU32::new(self.login_burst).ok_or(ConfigError::InvalidRateLimit)?,
        };

        Ok(ServerConfig {
            addr: SocketAddr::new(self.host, self.port),
            jwt_secret,
            admin: AdminCredentials {
                username: self.admin_user.filter(|u| !u.is_empty()),
                password: self.admin_pass.filter(|p| !p.is_empty()),
            },
            http: HttpConfig {
                client_origin,
                login_rate,
            },
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
