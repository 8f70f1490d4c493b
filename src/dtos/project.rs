//! Project DTOs

use super::dates;
use crate::entities::{Project, ProjectStatus, TaskBrief, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectTaskDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
}

impl From<TaskBrief> for ProjectTaskDTO {
    fn from(value: TaskBrief) -> Self {
        Self {
            id: value.id,
            title: value.title,
            status: value.status,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ProjectStatus,
    pub is_deleted: bool,
    pub tasks: Vec<ProjectTaskDTO>,
    pub assigned_users: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectDTO {
    fn from(value: Project) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            start_date: value.start_date,
            end_date: value.end_date,
            status: value.status,
            is_deleted: value.is_deleted,
            tasks: value.tasks.into_iter().map(Into::into).collect(),
            assigned_users: value.assigned_users,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ProjectMessageDTO {
    pub message: String,
    pub project: ProjectDTO,
}

#[derive(Serialize, Debug)]
pub struct UserProjectsDTO {
    pub count: usize,
    pub projects: Vec<ProjectDTO>,
}

/// Create body, also the insert payload of the projects table
#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectDTO {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: String,

    #[serde(deserialize_with = "dates::deserialize")]
    pub start_date: DateTime<Utc>,

    #[serde(deserialize_with = "dates::deserialize")]
    pub end_date: DateTime<Utc>,

    #[serde(default)]
    pub status: ProjectStatus,
}

/// Partial update body
#[derive(Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectDTO {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "dates::deserialize_option")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "dates::deserialize_option")]
    pub end_date: Option<DateTime<Utc>>,

    pub status: Option<ProjectStatus>,
}

impl UpdateProjectDTO {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.status.is_none()
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssignTasksDTO {
    pub task_ids: Vec<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssignUsersDTO {
    pub user_ids: Vec<i64>,
}
