//! Entities module - Domain entities
//!
//! Every entity maps onto one table of the database. Relations that live in
//! join tables (assignees, project members) are loaded by the repositories.

pub mod enums;
pub mod message;
pub mod project;
pub mod task;
pub mod user;

pub use enums::{ProjectStatus, TaskPriority, TaskStatus, UserRole};
pub use message::{ConversationSummary, Message, conversation_id};
pub use project::{Project, TaskBrief};
pub use task::{Task, TodoItem, checklist_progress};
pub use user::{User, UserSummary};
