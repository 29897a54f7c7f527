//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the Cloudinary image host.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Without a database URL the server keeps everything in memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    /// Production turns on `Secure` + `SameSite=None` session cookies.
    pub production: bool,
    pub session_ttl_days: i64,
    pub allowed_origins: Vec<String>,
    pub allowed_origin_suffixes: Vec<String>,
    pub max_upload_bytes: usize,
    pub mapbox_token: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_level: Level::INFO,
            production: false,
            session_ttl_days: 7,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:4173".to_string(),
            ],
            allowed_origin_suffixes: vec![".vercel.app".to_string()],
            max_upload_bytes: 10 * 1024 * 1024,
            mapbox_token: None,
            cloudinary: None,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        // --- Load Server and Database Settings ---
        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            Err(_) => defaults.bind_address,
        };

        let database_url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let production = std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let session_ttl_days = parse_number("SESSION_TTL_DAYS", defaults.session_ttl_days)?;
        if !(1..=3650).contains(&session_ttl_days) {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be between 1 and 3650".to_string(),
            ));
        }
        let max_upload_bytes = parse_number("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;

        // --- Load CORS Settings ---
        let mut allowed_origins =
            parse_list("ALLOWED_ORIGINS").unwrap_or(defaults.allowed_origins);
        if let Ok(frontend_url) = std::env::var("FRONTEND_URL") {
            if !frontend_url.is_empty() {
                allowed_origins.push(frontend_url.trim_end_matches('/').to_string());
            }
        }
        let allowed_origin_suffixes =
            parse_list("ALLOWED_ORIGIN_SUFFIXES").unwrap_or(defaults.allowed_origin_suffixes);

        // --- Load Collaborator Credentials (as optional) ---
        let mapbox_token = std::env::var("MAP_BOX_TOKEN").ok();
        let cloudinary = match (
            std::env::var("CLOUDINARY_CLOUD_NAME"),
            std::env::var("CLOUDINARY_API_KEY"),
            std::env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: std::env::var("CLOUDINARY_FOLDER")
                    .unwrap_or_else(|_| "wanderlust".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            production,
            session_ttl_days,
            allowed_origins,
            allowed_origin_suffixes,
            max_upload_bytes,
            mapbox_token,
            cloudinary,
        })
    }

    /// The Mapbox token, which the server cannot geocode without.
    pub fn require_mapbox_token(&self) -> Result<String, ConfigError> {
        self.mapbox_token
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("MAP_BOX_TOKEN".to_string()))
    }

    pub fn require_cloudinary(&self) -> Result<CloudinaryConfig, ConfigError> {
        self.cloudinary.clone().ok_or_else(|| {
            ConfigError::MissingVar(
                "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY or CLOUDINARY_API_SECRET".to_string(),
            )
        })
    }

    /// Whether a browser origin may make credentialed requests.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
            || self
                .allowed_origin_suffixes
                .iter()
                .any(|suffix| origin.starts_with("https://") && origin.ends_with(suffix.as_str()))
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_list(var: &str) -> Option<Vec<String>> {
    std::env::var(var).ok().map(|raw| {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_allow_list_and_suffixes() {
        let config = Config::default();
        assert!(config.is_allowed_origin("http://localhost:5173"));
        assert!(config.is_allowed_origin("https://wanderlust-git-main.vercel.app"));
        assert!(!config.is_allowed_origin("http://evil.vercel.app"));
        assert!(!config.is_allowed_origin("https://example.com"));
    }

    #[test]
    fn missing_collaborator_credentials_are_reported_by_name() {
        let config = Config::default();
        assert!(matches!(
            config.require_mapbox_token(),
            Err(ConfigError::MissingVar(var)) if var == "MAP_BOX_TOKEN"
        ));
        assert!(matches!(
            config.require_cloudinary(),
            Err(ConfigError::MissingVar(var)) if var.contains("CLOUDINARY_API_SECRET")
        ));

        let config = Config {
            mapbox_token: Some("pk.test".to_string()),
            ..Config::default()
        };
        assert_eq!(config.require_mapbox_token().unwrap(), "pk.test");
    }
}
