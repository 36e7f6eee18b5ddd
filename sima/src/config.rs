//! Application configuration.
//!
//! Configuration is loaded once at startup from a YAML file plus `SIMA_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `SIMA_AUTH__ACCESS_SECRET`). The resulting [`Config`] is immutable and
//! passed by value into every component constructor; business logic never
//! performs ambient environment lookups.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Simple CLI args - just for specifying the config file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SIMA_CONFIG_FILE", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Deployment environment. Controls config validation strictness and how
/// much error detail leaks into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

/// Main application configuration.
///
/// All fields have sensible defaults defined in the `Default` implementation,
/// so an empty config file yields a working development setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment
    pub environment: Environment,
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Authentication configuration (secrets, expiries, hashing cost)
    pub auth: AuthConfig,
    /// Photo upload configuration
    pub uploads: UploadsConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Export limits
    pub export: ExportConfig,
    /// Initial admin user, seeded when the usuarios table is empty
    pub admin: AdminConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: 4000,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            uploads: UploadsConfig::default(),
            cors: CorsConfig::default(),
            export: ExportConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. "sqlite://sima.db"
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// How long a statement waits on a locked database before failing
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sima.db".to_string(),
            max_connections: 10,
            min_connections: 2,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

const DEFAULT_ACCESS_SECRET: &str = "change_this_access_secret";
const DEFAULT_REFRESH_SECRET: &str = "change_this_refresh_secret";

/// Authentication configuration.
///
/// Access and refresh tokens are signed with distinct secrets so leaking one
/// does not compromise the other's signing key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Signing secret for access tokens
    pub access_secret: String,
    /// Signing secret for refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime (e.g. "15m")
    #[serde(with = "humantime_serde")]
    pub access_expiry: Duration,
    /// Refresh token lifetime (e.g. "7d")
    #[serde(with = "humantime_serde")]
    pub refresh_expiry: Duration,
    /// Argon2 cost parameters for password hashing
    pub argon2: Argon2Config,
    /// Minimum accepted password length on password changes
    pub password_min_length: usize,
    /// Maximum accepted password length
    pub password_max_length: usize,
    /// Length of generated temporary passwords for new users
    pub temp_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: DEFAULT_ACCESS_SECRET.to_string(),
            refresh_secret: DEFAULT_REFRESH_SECRET.to_string(),
            access_expiry: Duration::from_secs(15 * 60),
            refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            argon2: Argon2Config::default(),
            password_min_length: 8,
            password_max_length: 100,
            temp_password_length: 12,
        }
    }
}

/// Argon2id cost parameters.
///
/// Verification always uses the parameters embedded in the stored hash, so
/// these only affect newly created hashes. Higher cost trades request
/// latency for resistance to offline brute force.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    /// Secure defaults (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Photo upload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Directory where uploaded photos are stored
    pub directory: String,
    /// Maximum size of a single uploaded file, in bytes
    pub max_file_size: usize,
    /// Accepted file extensions (lowercase, with leading dot)
    pub allowed_extensions: Vec<String>,
    /// Maximum number of files per request
    pub max_files: usize,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            directory: "uploads".to_string(),
            max_file_size: 5 * 1024 * 1024,
            allowed_extensions: vec![
                ".jpg".to_string(),
                ".jpeg".to_string(),
                ".png".to_string(),
                ".webp".to_string(),
            ],
            max_files: 10,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// Export limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Maximum number of rows a single CSV/XLSX export may contain
    pub max_records: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { max_records: 10_000 }
    }
}

/// Initial admin account, created on first startup when no users exist.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub usuario: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            usuario: "admin".to_string(),
            password: "admin123".to_string(),
            nombre: "Admin".to_string(),
            apellido: "SIMA".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the YAML file named by `args` plus `SIMA_*`
    /// environment variables, then validate it.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config
            .validate()
            .map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file (missing file contributes nothing)
            .merge(Yaml::file(&args.config))
            // Environment variables can override specific values
            .merge(Env::prefixed("SIMA_").split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Reject configurations that cannot be run safely.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_production() {
            if self.auth.access_secret == DEFAULT_ACCESS_SECRET {
                return Err(Error::Internal {
                    operation: "validate config: auth.access_secret must be changed in production".to_string(),
                });
            }
            if self.auth.refresh_secret == DEFAULT_REFRESH_SECRET {
                return Err(Error::Internal {
                    operation: "validate config: auth.refresh_secret must be changed in production".to_string(),
                });
            }
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(Error::Internal {
                operation: format!(
                    "validate config: database.min_connections ({}) cannot exceed max_connections ({})",
                    self.database.min_connections, self.database.max_connections
                ),
            });
        }

        if self.auth.password_min_length == 0 || self.auth.password_min_length > self.auth.password_max_length {
            return Err(Error::Internal {
                operation: "validate config: invalid password length bounds".to_string(),
            });
        }

        if self.uploads.max_files == 0 {
            return Err(Error::Internal {
                operation: "validate config: uploads.max_files must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
