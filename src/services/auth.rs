//! Auth services - Registration, login, profile and password management

use crate::core::{AppError, AppState, encode_jwt, require_admin};
use crate::dtos::{
    AuthResponseDTO, ChangePasswordDTO, CreateUserDTO, ForgotPasswordDTO, LoginDTO,
    MessageResponseDTO, RegisterDTO, ResetPasswordDTO, UpdateProfileDTO, UpdateUserDTO, UserDTO,
    VerifiedUserDTO,
};
use crate::entities::{User, UserRole};
use crate::mailer::password_reset_email;
use crate::repositories::{Create, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Validity of a password reset link
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

lazy_static! {
    static ref RESET_TOKEN_RE: Regex = Regex::new(r"^[0-9a-fA-F]{64}$").unwrap();
}

/// 32 random bytes, hex encoded. Only the sha256 of it is stored.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn auth_response(user: User, secret: &str) -> Result<AuthResponseDTO, AppError> {
    let token = encode_jwt(user.id, &user.email, secret)?;
    Ok(AuthResponseDTO {
        user: UserDTO::from(user),
        token,
    })
}

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterDTO>,
) -> Result<(StatusCode, Json<AuthResponseDTO>), AppError> {
    debug!("Registering user");
    // 1. Validate the body
    // 2. Reject an email that is already registered
    // 3. Grant admin only when the invite token matches the configured one
    // 4. Hash the password, store the user and answer with a token
    body.validate()?;

    if state.user.find_by_email(&body.email).await?.is_some() {
        warn!("Email already registered");
        return Err(AppError::bad_request("User already exists"));
    }

    let role = match (&body.admin_invite_token, &state.admin_invite_token) {
        (Some(given), Some(expected)) if given == expected => UserRole::Admin,
        _ => UserRole::Member,
    };

    let user = state
        .user
        .create(&CreateUserDTO {
            name: body.name,
            email: body.email,
            password: User::hash_password(&body.password)?,
            profile_image_url: body.profile_image_url.unwrap_or_default(),
            role,
        })
        .await?;
    info!(user_id = user.id, ?role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(auth_response(user, &state.jwt_secret)?),
    ))
}

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginDTO>,
) -> Result<Json<AuthResponseDTO>, AppError> {
    let user = match state.user.find_by_email(&body.email).await? {
        Some(user) if user.verify_password(&body.password) => user,
        _ => {
            warn!("Login rejected");
            return Err(AppError::unauthorized("Invalid email or password"));
        }
    };

    let now = Utc::now();
    state.user.touch_last_login(user.id, now).await?;
    let user = User {
        last_login: Some(now),
        ..user
    };
    info!(user_id = user.id, "User logged in");

    Ok(Json(auth_response(user, &state.jwt_secret)?))
}

#[instrument(skip(current_user), fields(user_id = current_user.id))]
pub async fn get_profile(Extension(current_user): Extension<User>) -> Json<UserDTO> {
    Json(UserDTO::from(current_user))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdateProfileDTO>,
) -> Result<Json<AuthResponseDTO>, AppError> {
    let body = body.without_empty_fields();
    body.validate()?;

    if let Some(ref email) = body.email {
        if let Some(owner) = state.user.find_by_email(email).await? {
            if owner.id != current_user.id {
                warn!("Email already used by user {}", owner.id);
                return Err(AppError::bad_request("Email is already in use"));
            }
        }
    }

    let password = body
        .password
        .as_deref()
        .map(User::hash_password)
        .transpose()?;

    let updated = state
        .user
        .update(
            &current_user.id,
            &UpdateUserDTO {
                name: body.name,
                email: body.email,
                profile_image_url: body.profile_image_url,
                password,
            },
        )
        .await?;
    info!("Profile updated");

    Ok(Json(auth_response(updated, &state.jwt_secret)?))
}

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordDTO>,
) -> Result<Json<MessageResponseDTO>, AppError> {
    // 1. Find the user by email
    // 2. Store the hash of a fresh token with its expiry
    // 3. Email the plain token as a link to the web client
    body.validate()?;

    let user = state
        .user
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let token = generate_reset_token();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    state
        .user
        .set_reset_token(user.id, Some(&hash_reset_token(&token)), Some(expires_at))
        .await?;

    let reset_url = format!(
        "{}/resetpassword/{}",
        state.frontend_url.trim_end_matches('/'),
        token
    );
    if let Err(e) = state
        .mailer
        .send(password_reset_email(&user.email, &user.name, &reset_url))
    {
        error!("Reset email failed, clearing token: {:?}", e);
        state.user.set_reset_token(user.id, None, None).await?;
        return Err(e.into());
    }
    info!(user_id = user.id, "Password reset email sent");

    Ok(Json(MessageResponseDTO::new("Password reset email sent")))
}

#[instrument(skip(state, token, body))]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordDTO>,
) -> Result<Json<MessageResponseDTO>, AppError> {
    if !RESET_TOKEN_RE.is_match(&token) {
        warn!("Malformed reset token");
        return Err(AppError::bad_request("Invalid or expired reset token"));
    }
    body.validate()?;

    let user = state
        .user
        .find_by_reset_token(&hash_reset_token(&token), Utc::now())
        .await?
        .ok_or_else(|| {
            warn!("Reset token unknown or expired");
            AppError::bad_request("Invalid or expired reset token")
        })?;

    state
        .user
        .set_password(user.id, &User::hash_password(&body.password)?)
        .await?;
    info!(user_id = user.id, "Password reset");

    Ok(Json(MessageResponseDTO::new("Password reset successful")))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id))]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<ChangePasswordDTO>,
) -> Result<Json<MessageResponseDTO>, AppError> {
    body.validate()?;
    if !current_user.verify_password(&body.current_password) {
        warn!("Current password does not match");
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    state
        .user
        .set_password(current_user.id, &User::hash_password(&body.new_password)?)
        .await?;
    info!("Password changed");

    Ok(Json(MessageResponseDTO::new("Password changed successfully")))
}

#[derive(Serialize, Debug)]
pub struct VerifyUserResponse {
    message: String,
    user: VerifiedUserDTO,
}

#[instrument(skip(state, current_user), fields(admin_id = current_user.id))]
pub async fn verify_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i64>,
) -> Result<Json<VerifyUserResponse>, AppError> {
    require_admin(&current_user)?;

    if state.user.read(&user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    let user = state.user.set_verified(user_id).await?;
    info!(user_id, "User verified");

    Ok(Json(VerifyUserResponse {
        message: "User verified successfully".to_string(),
        user: user.into(),
    }))
}
