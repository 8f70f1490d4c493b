use crate::ws::TIMEOUT_DURATION_SECONDS;
use dotenv::dotenv;
use std::env;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "orbit-development-secret";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    /// Registering with this token grants the admin role
    pub admin_invite_token: Option<String>,
    /// Base URL of the web client, used to build password reset links
    pub frontend_url: String,
    pub mail_from: String,
    pub app_env: String,
    /// Seconds a WebSocket may stay silent before it is closed
    pub ws_idle_timeout_secs: u64,
}

impl Config {
    /// Load the configuration from the environment.
    /// Calls dotenv() first so a local .env file is honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://orbit.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "SERVER_PORT",
                reason: "must be a number between 0-65535",
            })?;

        let max_connections = env::var("MAX_DB_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "MAX_DB_CONNECTIONS",
                reason: "must be a positive number",
            })?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_DB_CONNECTIONS",
                reason: "must be a positive number",
            });
        }

        let admin_invite_token = env::var("ADMIN_INVITE_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Orbit Support <no-reply@orbit.local>".to_string());

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let ws_idle_timeout_secs = env::var("WS_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| TIMEOUT_DURATION_SECONDS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidValue {
                name: "WS_IDLE_TIMEOUT_SECS",
                reason: "must be a positive number of seconds",
            })?;

        Ok(Config {
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            admin_invite_token,
            frontend_url,
            mail_from,
            app_env,
            ws_idle_timeout_secs,
        })
    }

    /// Log the configuration, hiding secrets
    pub fn print_info(&self) {
        info!(environment = %self.app_env, "Server configuration");
        info!("Server address: {}:{}", self.server_host, self.server_port);
        info!("Database: {}", Self::mask_url(&self.database_url));
        info!("Max DB connections: {}", self.max_connections);
        info!("Frontend URL: {}", self.frontend_url);
        info!("WebSocket idle timeout: {}s", self.ws_idle_timeout_secs);
        info!(
            "Admin invite token: {}",
            if self.admin_invite_token.is_some() { "configured" } else { "disabled" }
        );
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("JWT secret: custom secret configured");
        }
    }

    /// Mask the credentials part of a database URL for logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        if url.starts_with("sqlite:") {
            return url.to_string();
        }
        "***".to_string()
    }
}
