//! Project entity

use super::enums::{ProjectStatus, TaskStatus};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ProjectStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded from project_members
    #[sqlx(skip)]
    pub assigned_users: Vec<i64>,
    /// Tasks whose project_id points here
    #[sqlx(skip)]
    pub tasks: Vec<TaskBrief>,
}

/// Minimal task projection attached to a project
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TaskBrief {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub status: TaskStatus,
}
