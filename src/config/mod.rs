//! Configuration module for the OSIS backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin password for session sign-in (required in production)
    pub admin_password: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to the image bucket directory
    pub storage_path: PathBuf,
    /// Base URL used to resolve bare photo references into public URLs
    pub public_base_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Admin session lifetime in hours
    pub session_ttl_hours: i64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_password = env::var("OSIS_ADMIN_PASSWORD").ok();

        let db_path = env::var("OSIS_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let storage_path = env::var("OSIS_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/images".to_string())
            .into();

        let public_base_url = env::var("OSIS_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let bind_addr = env::var("OSIS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid OSIS_BIND_ADDR format");

        let session_ttl_hours = env::var("OSIS_SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(12);

        let log_level = env::var("OSIS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            admin_password,
            db_path,
            storage_path,
            public_base_url,
            bind_addr,
            session_ttl_hours,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("OSIS_ADMIN_PASSWORD");
        env::remove_var("OSIS_DB_PATH");
        env::remove_var("OSIS_STORAGE_PATH");
        env::remove_var("OSIS_PUBLIC_BASE_URL");
        env::remove_var("OSIS_BIND_ADDR");
        env::remove_var("OSIS_SESSION_TTL_HOURS");
        env::remove_var("OSIS_LOG_LEVEL");

        let config = Config::from_env();

        assert!(config.admin_password.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/app.sqlite"));
        assert_eq!(config.storage_path, PathBuf::from("./data/images"));
        assert_eq!(config.public_base_url, "http://127.0.0.1:8080");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.session_ttl_hours, 12);
        assert_eq!(config.log_level, "info");
    }
}
