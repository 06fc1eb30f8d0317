use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_BACKEND_URL: &str = "http://localhost/cv-backend";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_health_path: String,
    pub backend_submit_path: String,
    pub backend_timeout_secs: u64,
    /// Where session documents are written; `None` keeps them in memory.
    pub session_dir: Option<PathBuf>,
    /// Sessions untouched for this long are unloaded and their documents dropped.
    pub session_idle_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            backend_url: env_or("BACKEND_URL", DEFAULT_BACKEND_URL),
            backend_health_path: env_or("BACKEND_HEALTH_PATH", "/health"),
            backend_submit_path: env_or("BACKEND_SUBMIT_PATH", "/submit"),
            backend_timeout_secs: parse_env("BACKEND_TIMEOUT_SECS", 30)?,
            session_dir: std::env::var("SESSION_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            session_idle_secs: parse_env("SESSION_IDLE_SECS", 7200)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_when_unset() {
        let value: u16 = parse_env("KL_INTAKE_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("KL_INTAKE_TEST_BAD_TIMEOUT", "soon");
        let err = parse_env::<u64>("KL_INTAKE_TEST_BAD_TIMEOUT", 30).unwrap_err();
        assert!(err.to_string().contains("KL_INTAKE_TEST_BAD_TIMEOUT"));
    }

    #[test]
    fn test_env_or_default() {
        assert_eq!(env_or("KL_INTAKE_TEST_UNSET_URL", DEFAULT_BACKEND_URL), DEFAULT_BACKEND_URL);
    }
}
