//! Task DTOs - Task bodies and the task shape returned to the client

use super::dates;
use super::user::UserSummaryDTO;
use crate::analytics::StatusSummary;
use crate::entities::{Task, TaskPriority, TaskStatus, TodoItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TaskProjectDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Vec<UserSummaryDTO>,
    pub created_by: Option<i64>,
    pub project: Option<TaskProjectDTO>,
    pub todo_checklist: Vec<TodoItem>,
    pub progress: i64,
    pub attachments: Vec<String>,
    pub completed_todo_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskDTO {
    fn from(value: Task) -> Self {
        let completed_todo_count = value.completed_todo_count();
        let project = match (value.project_id, value.project_name) {
            (Some(id), Some(name)) => Some(TaskProjectDTO { id, name }),
            _ => None,
        };
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            priority: value.priority,
            status: value.status,
            due_date: value.due_date,
            assigned_to: value.assigned_to.into_iter().map(Into::into).collect(),
            created_by: value.created_by,
            project,
            todo_checklist: value.todo_checklist.0,
            progress: value.progress,
            attachments: value.attachments.0,
            completed_todo_count,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// `GET /tasks` response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TaskListDTO {
    pub tasks: Vec<TaskDTO>,
    pub status_summary: StatusSummary,
}

/// `{ message, task }` envelope of the mutating task endpoints
#[derive(Serialize, Debug)]
pub struct TaskMessageDTO {
    pub message: String,
    pub task: TaskDTO,
}

#[derive(Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequestDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "dates::deserialize_option")]
    pub due_date: Option<DateTime<Utc>>,

    pub assigned_to: Vec<i64>,

    #[serde(default)]
    pub attachments: Vec<String>,

    #[serde(default)]
    pub todo_checklist: Vec<TodoItem>,

    pub project_id: i64,
}

#[derive(Deserialize, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequestDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "dates::deserialize_option")]
    pub due_date: Option<DateTime<Utc>>,
    pub todo_checklist: Option<Vec<TodoItem>>,
    pub attachments: Option<Vec<String>>,
    pub assigned_to: Option<Vec<i64>>,
    pub project_id: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateTaskStatusDTO {
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChecklistDTO {
    pub todo_checklist: Vec<TodoItem>,
}

/// Insert payload for the tasks table
#[derive(Debug, Clone)]
pub struct CreateTaskDTO {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub project_id: i64,
    pub assigned_to: Vec<i64>,
    pub todo_checklist: Vec<TodoItem>,
    pub progress: i64,
    pub attachments: Vec<String>,
}

/// Partial update of a task row. `assigned_to`, when present, replaces the assignee set.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskDTO {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub todo_checklist: Option<Vec<TodoItem>>,
    pub attachments: Option<Vec<String>>,
    pub assigned_to: Option<Vec<i64>>,
}

impl From<UpdateTaskRequestDTO> for UpdateTaskDTO {
    fn from(value: UpdateTaskRequestDTO) -> Self {
        Self {
            title: value.title,
            description: value.description,
            priority: value.priority,
            due_date: value.due_date,
            project_id: value.project_id,
            todo_checklist: value.todo_checklist,
            attachments: value.attachments,
            assigned_to: value.assigned_to,
        }
    }
}
