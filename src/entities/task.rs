//! Task entity - Task record and checklist driven progress transitions

use super::enums::{TaskPriority, TaskStatus};
use super::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub project_id: Option<i64>,
    /// Joined from projects, None when the task has no project
    pub project_name: Option<String>,
    pub todo_checklist: Json<Vec<TodoItem>>,
    pub progress: i64,
    pub attachments: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded from task_assignees after the row is fetched
    #[sqlx(skip)]
    pub assigned_to: Vec<UserSummary>,
}

impl Task {
    pub fn completed_todo_count(&self) -> usize {
        self.todo_checklist.iter().filter(|item| item.completed).count()
    }

    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.assigned_to.iter().any(|u| u.id == user_id)
    }

    /// Overdue means not completed and due strictly before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < now)
    }

    /// Replace the checklist and derive progress and status from it.
    pub fn apply_checklist(&mut self, items: Vec<TodoItem>) {
        self.todo_checklist = Json(items);
        self.progress = checklist_progress(&self.todo_checklist);
        self.status = match self.progress {
            100 => TaskStatus::Completed,
            p if p > 0 => TaskStatus::InProgress,
            _ => TaskStatus::Pending,
        };
    }

    /// Set the status directly. Completing a task ticks every checklist item.
    pub fn apply_status(&mut self, status: TaskStatus) {
        self.status = status;
        if status == TaskStatus::Completed {
            self.todo_checklist
                .iter_mut()
                .for_each(|item| item.completed = true);
            self.progress = 100;
        }
    }
}

/// Completed items as a rounded percentage (half rounds up), 0 for an empty list
pub fn checklist_progress(items: &[TodoItem]) -> i64 {
    let total = items.len() as i64;
    if total == 0 {
        return 0;
    }
    let done = items.iter().filter(|item| item.completed).count() as i64;
    (done * 100 + total / 2) / total
}
