use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::SessionPolicy;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;
const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;
const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Production inside AWS Lambda or when `APP_ENV` says so.
    pub fn detect() -> Self {
        Self::detect_from(|key| env::var(key).ok())
    }

    pub fn detect_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if lookup("AWS_LAMBDA_FUNCTION_NAME").is_some() {
            return Self::Production;
        }

        match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("STORE_BACKEND must be `postgres` or `memory`, got `{other}`"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub database_pool_size: u32,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub session_policy: SessionPolicy,
    pub bcrypt_cost: u32,
    pub media_root: PathBuf,
    pub upload_tmp_dir: PathBuf,
    pub public_base_url: String,
    pub cors_origin: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_upload_mb: usize,
}

impl Config {
    /// Reads the process environment; `.env` is honored in development only.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::detect();

        tracing::info!("Environment detected: {}", environment.as_str());

        if environment.is_production() {
            tracing::info!("Production mode: using injected environment variables");
        } else {
            match dotenvy::dotenv() {
                Ok(path) => tracing::debug!("Loaded {}", path.display()),
                Err(_) => tracing::warn!(".env file not found, using environment variables"),
            }
        }

        let config = Self::from_lookup(|key| env::var(key).ok())?;

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("   Store: {:?}", config.store_backend);
        tracing::debug!("   Database: {}", Self::mask_credentials(&config.database_url));
        tracing::debug!("   Sessions: {:?}", config.session_policy);
        tracing::debug!("   Media root: {}", config.media_root.display());
        tracing::debug!("   Server: {}:{}", config.server_host, config.server_port);

        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = Environment::detect_from(&lookup);

        let store_backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse::<StoreBackend>()?,
            None => StoreBackend::Postgres,
        };
        let database_url = Self::get_database_url(&lookup, &environment, store_backend)?;
        let access_token_secret = Self::get_secret(&lookup, &environment, "ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = Self::get_secret(&lookup, &environment, "REFRESH_TOKEN_SECRET")?;
        if access_token_secret == refresh_token_secret && environment.is_production() {
            anyhow::bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }

        let session_policy = match lookup("SESSION_POLICY") {
            Some(value) => value.parse::<SessionPolicy>().map_err(anyhow::Error::msg)?,
            None => SessionPolicy::default(),
        };

        let server_port = parse_or(&lookup, "SERVER_PORT", 3000u16)?;
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{server_port}"));

        Ok(Self {
            store_backend,
            database_url,
            database_pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", 5)?,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_minutes: parse_in_range(
                &lookup,
                "ACCESS_TOKEN_TTL_MINUTES",
                15,
                MAX_ACCESS_TOKEN_TTL_MINUTES,
            )?,
            refresh_token_ttl_days: parse_in_range(
                &lookup,
                "REFRESH_TOKEN_TTL_DAYS",
                10,
                MAX_REFRESH_TOKEN_TTL_DAYS,
            )?,
            session_policy,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./media")),
            upload_tmp_dir: lookup("UPLOAD_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            public_base_url,
            cors_origin: Self::get_cors_origin(&lookup, &environment),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            max_upload_mb: parse_or(&lookup, "MAX_UPLOAD_MB", 200)?,
            environment,
        })
    }

    fn get_database_url(
        lookup: &impl Fn(&str) -> Option<String>,
        environment: &Environment,
        store_backend: StoreBackend,
    ) -> Result<String> {
        if let Some(url) = lookup("DATABASE_URL") {
            return Ok(url);
        }

        if environment.is_production() && store_backend == StoreBackend::Postgres {
            anyhow::bail!(
                "DATABASE_URL must be set in production! \
                 Configure it in Lambda environment variables."
            );
        }

        // Development: assemble from the docker-compose variables.
        let user = lookup("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string());
        let password = lookup("POSTGRES_PASSWORD").unwrap_or_else(|| "postgres".to_string());
        let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string());
        let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
        let database = lookup("POSTGRES_DB").unwrap_or_else(|| "vidhub".to_string());

        Ok(format!("postgres://{user}:{password}@{host}:{port}/{database}"))
    }

    fn get_secret(
        lookup: &impl Fn(&str) -> Option<String>,
        environment: &Environment,
        name: &str,
    ) -> Result<String> {
        let secret = match lookup(name) {
            Some(secret) => secret,
            None if environment.is_production() => {
                tracing::error!("{name} not set in production!");
                anyhow::bail!("{name} is required in production");
            }
            None => {
                tracing::warn!("{name} not set, using default (DEVELOPMENT ONLY!)");
                format!("dev_{}_change_in_production", name.to_ascii_lowercase())
            }
        };

        if environment.is_production() && secret.len() < MIN_PRODUCTION_SECRET_LEN {
            anyhow::bail!(
                "{name} must be at least {MIN_PRODUCTION_SECRET_LEN} characters in production (current: {})",
                secret.len()
            );
        }

        Ok(secret)
    }

    fn get_cors_origin(lookup: &impl Fn(&str) -> Option<String>, environment: &Environment) -> String {
        lookup("CORS_ORIGIN").unwrap_or_else(|| {
            if environment.is_production() {
                "https://vidhub.app".to_string()
            } else {
                "http://localhost:5173".to_string()
            }
        })
    }

    fn mask_credentials(url: &str) -> String {
        if let Some(at_pos) = url.find('@')
            && let Some(scheme_end) = url.find("://")
        {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{scheme}***:***{after_at}");
        }
        url.to_string()
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value `{raw}`")),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but the value must fall within `1..=max`.
fn parse_in_range(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
    max: i64,
) -> Result<i64> {
    let value = parse_or(lookup, key, default)?;
    if !(1..=max).contains(&value) {
        anyhow::bail!("{key} must be between 1 and {max}, got {value}");
    }
    Ok(value)
}
