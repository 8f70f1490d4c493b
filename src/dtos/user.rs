//! User DTOs - Authentication bodies and user projections

use crate::entities::{User, UserRole, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User as returned to the client, never carries the password
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub profile_image_url: String,
    pub is_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role,
            profile_image_url: value.profile_image_url,
            is_verified: value.is_verified,
            last_login: value.last_login,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_image_url: String,
}

impl From<UserSummary> for UserSummaryDTO {
    fn from(value: UserSummary) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            profile_image_url: value.profile_image_url,
        }
    }
}

/// Register and login response: the user plus a fresh token
#[derive(Serialize, Debug)]
pub struct AuthResponseDTO {
    #[serde(flatten)]
    pub user: UserDTO,
    pub token: String,
}

/// Member listing entry with per-status task counts
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MemberDTO {
    #[serde(flatten)]
    pub user: UserDTO,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUserDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
}

impl From<User> for VerifiedUserDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            is_verified: value.is_verified,
        }
    }
}

#[derive(Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDTO {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[serde(default)]
    pub profile_image_url: Option<String>,

    #[serde(default)]
    pub admin_invite_token: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginDTO {
    pub email: String,
    pub password: String,
}

/// Profile update. Empty strings are treated as absent fields.
#[derive(Deserialize, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileDTO {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    pub profile_image_url: Option<String>,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

impl UpdateProfileDTO {
    pub fn without_empty_fields(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self {
            name: keep(self.name),
            email: keep(self.email),
            profile_image_url: keep(self.profile_image_url),
            password: keep(self.password),
        }
    }
}

#[derive(Deserialize, Debug, Validate)]
pub struct ForgotPasswordDTO {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct ResetPasswordDTO {
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordDTO {
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

/// Insert payload for the users table, password already hashed
#[derive(Debug, Clone)]
pub struct CreateUserDTO {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_image_url: String,
    pub role: UserRole,
}

/// Partial update of a user row, password already hashed
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDTO {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_image_url: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserDTO {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.profile_image_url.is_none()
            && self.password.is_none()
    }
}
