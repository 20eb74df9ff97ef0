/// Configuration management for the API server
///
/// Configuration is read from environment variables (and a `.env` file in
/// development) into a typed [`Config`].
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `JWT_SECRET`: Secret key for session tokens (required, at least 32 chars)
/// - `JWT_EXPIRATION_HOURS`: session lifetime (default: 48)
/// - `GCP_CLIENT_ID`, `GCP_CLIENT_SECRET`, `GCP_REDIRECT_URL`: Google
///   Calendar OAuth client; calendar sync is disabled unless all three are set
/// - `CALENDAR_TIME_ZONE`: time zone stamped on calendar events (default: UTC)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use tasker_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use tasker_shared::auth::jwt::DEFAULT_SESSION_HOURS;
use tasker_shared::calendar::google::GoogleCalendarConfig;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session token configuration
    pub jwt: JwtConfig,

    /// Google Calendar client, if configured
    pub calendar: Option<CalendarConfig>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for HS256 signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Session lifetime in hours
    pub expiration_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}

/// Google Calendar OAuth client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub time_zone: String,
}

impl std::fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

impl From<CalendarConfig> for GoogleCalendarConfig {
    fn from(config: CalendarConfig) -> Self {
        GoogleCalendarConfig {
            client_id: config.client_id,
            client_secret: config.client_secret,
            redirect_url: config.redirect_url,
            time_zone: config.time_zone,
        }
    }
}

/// Splits a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - Only some of the Google Calendar variables are set
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| DEFAULT_SESSION_HOURS.to_string())
            .parse::<i64>()?;

        if expiration_hours <= 0 {
            anyhow::bail!("JWT_EXPIRATION_HOURS must be positive");
        }

        let calendar = match (
            optional_var("GCP_CLIENT_ID"),
            optional_var("GCP_CLIENT_SECRET"),
            optional_var("GCP_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(CalendarConfig {
                client_id,
                client_secret,
                redirect_url,
                time_zone: optional_var("CALENDAR_TIME_ZONE").unwrap_or_else(|| "UTC".to_string()),
            }),
            (None, None, None) => None,
            _ => anyhow::bail!(
                "GCP_CLIENT_ID, GCP_CLIENT_SECRET and GCP_REDIRECT_URL must be set together"
            ),
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours,
            },
            calendar,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> tasker_shared::db::pool::DatabaseConfig {
        tasker_shared::db::pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}
