//! Core Module - Infrastructure components of the application
//!
//! - Authentication and JWT
//! - Configuration
//! - Error handling
//! - Application state

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use auth::{
    Claims, admin_only_middleware, authentication_middleware, decode_jwt, encode_jwt,
    require_admin, require_self_or_admin,
};
pub use config::{Config, ConfigError};
pub use error::AppError;
pub use state::AppState;
