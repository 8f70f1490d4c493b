//! Mailer - Outgoing email seam
//!
//! Handlers build an [`OutgoingEmail`] from one of the templates below and hand
//! it to the [`Mailer`] stored in the application state. The default
//! [`LogMailer`] only records the email through `tracing`; a real transport can
//! be plugged in with `AppState::with_mailer`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Mailer for LogMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(from = %self.from, "Email queued ({} bytes of html)", email.html.len());
        Ok(())
    }
}

fn wrap(body: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <h1 style="font-size: 1.5rem; font-weight: 800; margin-bottom: 20px;">
        <span style="color: #333;">Orbit</span><span style="color: #1368EC;">.</span>
    </h1>
{body}
    <hr style="border: 0; height: 1px; background: #ddd; margin: 20px 0;" />
    <p style="font-size: 14px; color: #888;">Best regards,</p>
    <p style="font-size: 14px; color: #888;">The Orbit Team</p>
</div>"#
    )
}

/// Password reset email carrying the one-time link
pub fn password_reset_email(to: &str, name: &str, reset_url: &str) -> OutgoingEmail {
    let body = format!(
        r#"    <h2 style="color: #1368EC;">Reset Your Password</h2>
    <p>Dear {name},</p>
    <p>You requested a password reset. Click the link below to reset your password:</p>
    <a href="{reset_url}" style="color: #1368EC; text-decoration: none;">Reset Password</a>
    <p>This link is valid for the next <strong>10 minutes</strong>.</p>
    <p>If you did not request this, please ignore this email or contact our support team immediately.</p>"#
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: "Password Reset".to_string(),
        html: wrap(&body),
    }
}

pub struct TaskAssignment<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub priority: &'a str,
    pub due_date: Option<DateTime<Utc>>,
    pub project_name: &'a str,
}

/// Notification sent to every assignee of a freshly created task
pub fn task_assigned_email(to: &str, name: &str, task: &TaskAssignment<'_>) -> OutgoingEmail {
    let due = task
        .due_date
        .map(|d| d.format("%B %-d, %Y at %-I:%M %p").to_string())
        .unwrap_or_else(|| "No due date specified".to_string());
    let description = if task.description.is_empty() {
        "No description provided"
    } else {
        task.description
    };
    let body = format!(
        r#"    <h2 style="color: #1368EC;">New Task Assigned</h2>
    <p>Dear {name},</p>
    <p>You have been assigned a new task. Here are the details:</p>
    <p><strong>Title:</strong> {title}</p>
    <p><strong>Description:</strong> {description}</p>
    <p><strong>Priority:</strong> {priority}</p>
    <p><strong>Due Date:</strong> {due}</p>
    <p><strong>Project:</strong> {project}</p>
    <p>Please log in to Orbit to view more details and start working on your task.</p>"#,
        title = task.title,
        priority = task.priority,
        project = task.project_name,
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("New Task Assigned: {}", task.title),
        html: wrap(&body),
    }
}
