//! DTOs module - Data Transfer Objects
//!
//! Request bodies and response shapes of the HTTP API. Responses use camelCase
//! keys and expose ids as `_id`, which is what the web client expects.

pub mod chat;
pub mod dates;
pub mod project;
pub mod query;
pub mod task;
pub mod user;

use serde::Serialize;

pub use chat::{
    ChatEventDTO, ConversationDTO, MarkReadDTO, MessageDTO, OutgoingChatDTO, SendMessageDTO,
};
pub use project::{
    AssignTasksDTO, AssignUsersDTO, CreateProjectDTO, ProjectDTO, ProjectMessageDTO,
    ProjectTaskDTO, UpdateProjectDTO, UserProjectsDTO,
};
pub use query::TaskListQuery;
pub use task::{
    CreateTaskDTO, CreateTaskRequestDTO, TaskDTO, TaskListDTO, TaskMessageDTO, TaskProjectDTO,
    UpdateChecklistDTO, UpdateTaskDTO, UpdateTaskRequestDTO, UpdateTaskStatusDTO,
};
pub use user::{
    AuthResponseDTO, ChangePasswordDTO, CreateUserDTO, ForgotPasswordDTO, LoginDTO,
    MemberDTO, RegisterDTO, ResetPasswordDTO, UpdateProfileDTO, UpdateUserDTO, UserDTO,
    UserSummaryDTO, VerifiedUserDTO,
};

/// Plain `{ "message": ... }` acknowledgement
#[derive(Serialize, Debug)]
pub struct MessageResponseDTO {
    pub message: String,
}

impl MessageResponseDTO {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
