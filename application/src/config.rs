//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use service::infra::identity::cognito;
use smart_default::SmartDefault;

use crate::{gate, session};

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Session configuration.
    pub session: Session,

    /// Authorization gate configuration.
    pub gate: Gate,

    /// Identity provider configuration.
    pub identity: Identity,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,

    /// Indicator whether session cookies are marked `Secure`.
    ///
    /// Must be enabled in production, where the server is behind HTTPS.
    #[default(true)]
    pub secure_cookies: bool,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Session configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Session {
    /// Secret the cookie encryption key is derived from.
    ///
    /// Must be the same across all the application instances.
    pub secret: String,

    /// Lifetime of the access and ID token cookies.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub access_ttl: time::Duration,

    /// Lifetime of the refresh token cookie.
    #[default(time::Duration::from_secs(60 * 60 * 24 * 30))]
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: time::Duration,
}

impl Session {
    /// Returns the secret the cookie encryption key is derived from.
    #[must_use]
    pub fn secret(&self) -> SecretString {
        SecretString::from(self.secret.as_str())
    }

    /// Builds the [`session::Config`] out of this [`Session`] configuration.
    #[must_use]
    pub fn cookies(&self, secure: bool) -> session::Config {
        session::Config {
            secure,
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        }
    }
}

/// Authorization gate configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Gate {
    /// Path prefixes requiring an authenticated session.
    #[default(vec!["/private".to_owned()])]
    pub protected: Vec<String>,

    /// Path of the sign-in page unauthenticated requests are redirected to.
    #[default("/signin".to_owned())]
    pub sign_in: String,
}

impl From<Gate> for gate::Config {
    fn from(value: Gate) -> Self {
        let Gate { protected, sign_in } = value;
        Self { protected, sign_in }
    }
}

/// Identity provider configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Identity {
    /// Kind of the identity provider to use.
    pub kind: IdentityKind,

    /// [AWS Cognito] configuration.
    ///
    /// [AWS Cognito]: https://docs.aws.amazon.com/cognito
    pub cognito: Cognito,
}

/// Kind of an identity provider.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// [AWS Cognito] user pool.
    ///
    /// [AWS Cognito]: https://docs.aws.amazon.com/cognito
    #[default]
    Cognito,

    /// In-memory provider with demo accounts, for development only.
    Fake,
}

/// [AWS Cognito] configuration.
///
/// [AWS Cognito]: https://docs.aws.amazon.com/cognito
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cognito {
    /// AWS region of the user pool.
    ///
    /// Derived from the user pool ID, if not set.
    pub region: Option<String>,

    /// ID of the user pool.
    pub user_pool_id: String,

    /// ID of the app client.
    pub client_id: String,

    /// Secret of the app client, if it's a confidential one.
    pub client_secret: Option<String>,

    /// Endpoint overriding the regional one.
    pub endpoint: Option<String>,

    /// Timeout of a single request to the user pool.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<Cognito> for cognito::Config {
    fn from(value: Cognito) -> Self {
        let Cognito {
            region,
            user_pool_id,
            client_id,
            client_secret,
            endpoint,
            timeout,
        } = value;

        Self {
            region,
            user_pool_id,
            client_id,
            client_secret: client_secret
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
            endpoint: endpoint.filter(|e| !e.is_empty()),
            timeout,
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
