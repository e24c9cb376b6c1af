//! Authorization server configuration.
//!
//! Configuration is plain serde data so that embedders can nest it inside
//! their own settings file. Durations use humantime strings (`"10m"`,
//! `"30d"`). [`loader::load_config`] reads a TOML file and applies
//! `MCP_OAUTH__...` environment overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Minimum accepted length, in bytes, of the session HMAC secret.
pub const MIN_HMAC_SECRET_LEN: usize = 32;

/// Root authorization server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://auth.example.com"
/// resource = "https://mcp.example.com"
///
/// [oauth]
/// hmac_secret = "change-me-to-at-least-32-random-bytes"
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "30d"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public base URL of the authorization server.
    pub issuer: String,

    /// Identifier of the protected MCP resource (RFC 8707 audience).
    pub resource: String,

    /// Path prefix under which the OAuth endpoints are mounted.
    pub base_path: String,

    /// Protocol and token settings.
    pub oauth: OAuthConfig,

    /// Dynamic client registration settings.
    pub registration: RegistrationConfig,

    /// Discovery document settings.
    pub discovery: DiscoveryConfig,

    /// Session binding cookie settings.
    pub cookies: CookieConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:3000".to_string(),
            resource: "http://localhost:3000/mcp".to_string(),
            base_path: "/oauth".to_string(),
            oauth: OAuthConfig::default(),
            registration: RegistrationConfig::default(),
            discovery: DiscoveryConfig::default(),
            cookies: CookieConfig::default(),
        }
    }
}

/// OAuth protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Lifetime of an authorization session spanning the IdP redirect.
    #[serde(with = "humantime_serde")]
    pub session_lifetime: Duration,

    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Secret keying the session-state HMAC.
    pub hmac_secret: SecretString,

    /// Accept the `plain` PKCE method when redeeming codes.
    ///
    /// Legacy switch: the authorize endpoint only ever issues S256 codes, so
    /// this only matters for codes created by older deployments.
    pub allow_plain_pkce: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime: Duration::from_secs(600),              // 10 minutes
            authorization_code_lifetime: Duration::from_secs(600),   // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),        // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            hmac_secret: SecretString::default(),
            allow_plain_pkce: false,
        }
    }
}

/// Dynamic client registration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Expose the registration endpoint.
    pub enabled: bool,

    /// Scope assigned to clients that register without one.
    pub default_scope: Option<String>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_scope: None,
        }
    }
}

/// Discovery document configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Scopes advertised in both metadata documents.
    pub scopes_supported: Vec<String>,

    /// Human-readable documentation URL for the protected resource.
    pub resource_documentation: Option<String>,
}

/// Cookies carrying the session binding across the IdP redirect.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Name prefix for the session id and session state cookies.
    pub prefix: String,

    /// Mark cookies `Secure`. Disable only for plain-http local development.
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            prefix: "mcp_oauth".to_string(),
            secure: true,
        }
    }
}

/// A string secret whose `Debug` output is redacted.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when the HMAC secret is unset, and
    /// `ConfigError::InvalidValue` if:
    /// - The issuer or resource is empty or not an absolute URL
    /// - The base path does not start with `/`
    /// - The HMAC secret is shorter than [`MIN_HMAC_SECRET_LEN`] bytes
    /// - Any lifetime is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("issuer", &self.issuer)?;
        validate_url("resource", &self.resource)?;

        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "base_path must start with '/', got '{}'",
                self.base_path
            )));
        }

        let secret = self.oauth.hmac_secret.expose();
        if secret.is_empty() {
            return Err(ConfigError::Missing("oauth.hmac_secret".to_string()));
        }
        if secret.len() < MIN_HMAC_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "oauth.hmac_secret must be at least {MIN_HMAC_SECRET_LEN} bytes"
            )));
        }

        let lifetimes = [
            ("session_lifetime", self.oauth.session_lifetime),
            (
                "authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
            ),
            ("access_token_lifetime", self.oauth.access_token_lifetime),
            ("refresh_token_lifetime", self.oauth.refresh_token_lifetime),
        ];
        for (name, lifetime) in lifetimes {
            if lifetime.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "oauth.{name} must be > 0"
                )));
            }
        }

        Ok(())
    }

    /// Builds the absolute URL of an endpoint mounted under `base_path`.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.issuer.trim_end_matches('/'),
            self.base_path.trim_end_matches('/'),
            path
        )
    }

    /// Issuer URL without a trailing slash.
    #[must_use]
    pub fn issuer_url(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }
}

fn validate_url(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue(format!("{name} cannot be empty")));
    }
    let parsed = url::Url::parse(value).map_err(|e| {
        ConfigError::InvalidValue(format!("{name} must be an absolute URL: {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must use http or https"
        )));
    }
    if parsed.fragment().is_some() {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must not contain a fragment"
        )));
    }
    Ok(())
}

pub mod loader {
    //! File and environment configuration loading.

    use super::{AuthConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Environment variable prefix, e.g. `MCP_OAUTH__OAUTH__HMAC_SECRET`.
    pub const ENV_PREFIX: &str = "MCP_OAUTH";

    /// Loads the configuration from an optional TOML file plus environment
    /// overrides, then validates it.
    ///
    /// When `path` is `None`, `mcp-oauth.toml` in the working directory is
    /// used if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be parsed, or a
    /// validation error from [`AuthConfig::validate`].
    pub fn load_config(path: Option<&str>) -> Result<AuthConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("mcp-oauth.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: AuthConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
