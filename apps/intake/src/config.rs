use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://dashboard/recruitment_final.db?mode=rwc";
const DEFAULT_DASHBOARD_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_UPLOAD_DIR: &str = "campus/uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// How the local fallback maps a record onto the `applications` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Fixed baseline column set; fields outside it are dropped.
    #[default]
    Baseline,
    /// Columns follow the locally resolved form schema.
    SchemaDriven,
}

impl FromStr for PersistMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(PersistMode::Baseline),
            "schema" | "schema-driven" | "schema_driven" => Ok(PersistMode::SchemaDriven),
            other => bail!("unknown PERSIST_MODE '{other}' (expected 'baseline' or 'schema')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to every component through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub dashboard_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub health_timeout: Duration,
    pub remote_timeout: Duration,
    pub persist_mode: PersistMode,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            dashboard_url: env_or("DASHBOARD_URL", DEFAULT_DASHBOARD_URL)
                .trim_end_matches('/')
                .to_string(),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            allowed_extensions: match std::env::var("ALLOWED_EXTENSIONS") {
                Ok(raw) => parse_extensions(&raw),
                Err(_) => default_extensions(),
            },
            health_timeout: Duration::from_secs(parse_env("HEALTH_TIMEOUT_SECS", 5u64)?),
            remote_timeout: Duration::from_secs(parse_env("REMOTE_TIMEOUT_SECS", 30u64)?),
            persist_mode: env_or("PERSIST_MODE", "baseline").parse()?,
            port: parse_env("PORT", 5001u16)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Whether `extension` (without the dot) is accepted, ignoring case.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| *e == extension)
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for tests: uploads go to `upload_dir`, the dashboard is
    /// never contacted unless a test wires a real one in.
    pub fn for_tests(upload_dir: impl Into<PathBuf>) -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            dashboard_url: "http://127.0.0.1:9".to_string(),
            upload_dir: upload_dir.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: default_extensions(),
            health_timeout: Duration::from_secs(1),
            remote_timeout: Duration::from_secs(2),
            persist_mode: PersistMode::Baseline,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
