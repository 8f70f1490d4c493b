use crate::core::{AppError, AppState};
use crate::entities::User;
use crate::repositories::Read;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Lifetime of an issued token
pub const TOKEN_TTL_DAYS: i64 = 7;

// Content of the JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i64,
    pub email: String,
}

#[instrument(skip(secret), fields(email = %email, id = %id))]
pub fn encode_jwt(id: i64, email: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let exp: usize = (now + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        id,
        email: email.to_string(),
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .inspect(|_| info!("JWT token encoded successfully"))
    .inspect_err(|e| error!("Failed to encode JWT token: {:?}", e))
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .inspect(|data| debug!("JWT token decoded for user {}", data.claims.id))
    .inspect_err(|e| warn!("Failed to decode JWT token: {:?}", e))
}

/// Extract the token from an `Authorization: Bearer <token>` header value
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Not authorized, invalid token")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::unauthorized("Not authorized, no token"));
        }
    };

    let token = bearer_token(auth_header).ok_or_else(|| {
        warn!("Authorization header is not a bearer token");
        AppError::unauthorized("Not authorized, no token")
    })?;

    let token_data = decode_jwt(token, &state.jwt_secret)
        .map_err(|_| AppError::unauthorized("Not authorized, token failed"))?;

    // Fetch the user details from the database
    let current_user = match state.user.read(&token_data.claims.id).await? {
        Some(user) => {
            debug!("User authenticated: {}", user.email);
            user
        }
        None => {
            warn!("User not found in database: {}", token_data.claims.id);
            return Err(AppError::unauthorized("Not authorized, user not found"));
        }
    };
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Middleware that lets only admins through.
/// Must run after authentication_middleware, which puts the User in the extensions.
#[instrument(skip(req, next))]
pub async fn admin_only_middleware(req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let current_user = req.extensions().get::<User>().ok_or_else(|| {
        warn!("User not found in request extensions");
        AppError::unauthorized("User not authenticated")
    })?;
    require_admin(current_user)?;
    Ok(next.run(req).await)
}

/// Fails with 403 unless the user is an admin
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if !user.is_admin() {
        warn!("User {} attempted an admin only action", user.id);
        return Err(AppError::forbidden("Access denied, admin only"));
    }
    Ok(())
}

/// Fails with 403 unless the user is `target_id` or an admin
pub fn require_self_or_admin(user: &User, target_id: i64) -> Result<(), AppError> {
    if user.id != target_id && !user.is_admin() {
        warn!(
            "User {} attempted to access resources of user {}",
            user.id, target_id
        );
        return Err(AppError::forbidden("Not authorized to access this resource"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip_keeps_claims() {
        let token = encode_jwt(42, "bob@orbit.test", "secret").expect("encode");
        let data = decode_jwt(&token, "secret").expect("decode");
        assert_eq!(data.claims.id, 42);
        assert_eq!(data.claims.email, "bob@orbit.test");
        let ttl = data.claims.exp - data.claims.iat;
        assert_eq!(ttl as i64, TOKEN_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let token = encode_jwt(42, "bob@orbit.test", "secret").expect("encode");
        assert!(decode_jwt(&token, "another").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer abc def"), None);
    }
}
