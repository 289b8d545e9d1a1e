//! Reminder delivery seam.
//!
//! The dispatcher hands a [`ReminderNotice`] to a [`Notifier`] and only marks
//! the task reminded when the call returns `Ok`. Actual mail delivery is not
//! done here: [`LogNotifier`] writes the message to the log and
//! [`OutboxNotifier`] queues it for an external mailer.

mod outbox;

pub use outbox::OutboxNotifier;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::NotifyError;

/// Everything a transport needs to remind one student about one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderNotice {
    pub task_id: String,
    /// Student e-mail address
    pub contact: String,
    pub display_name: String,
    pub title: String,
    pub description: Option<String>,
    /// e.g. "3 hours and 42 minutes"
    pub remaining_text: String,
    /// e.g. "2025-03-14 17:00 UTC"
    pub due_text: String,
}

/// A rendered reminder e-mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl ReminderMessage {
    pub fn render(notice: &ReminderNotice) -> Self {
        let mut body = format!(
            "Dear {},\n\nThis is a reminder that your task \"{}\" is due soon.\n\n",
            notice.display_name, notice.title
        );
        body.push_str("Task Details:\n");
        body.push_str(&format!("Title: {}\n", notice.title));
        if let Some(description) = notice
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
        {
            body.push_str(&format!("Description: {description}\n"));
        }
        body.push_str(&format!("Due Date: {}\n", notice.due_text));
        body.push_str(&format!("Time Remaining: {}\n\n", notice.remaining_text));
        body.push_str("Please complete your task before the deadline.\n\n");
        body.push_str("Best regards,\nSmartEval Team");

        Self {
            recipient: notice.contact.clone(),
            subject: format!("SmartEval - Task Reminder: {}", notice.title),
            body,
        }
    }
}

/// Delivers reminders. Called synchronously, once per candidate task.
pub trait Notifier: Send + Sync {
    fn send_reminder(&self, notice: &ReminderNotice) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn send_reminder(&self, notice: &ReminderNotice) -> Result<(), NotifyError> {
        (**self).send_reminder(notice)
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn send_reminder(&self, notice: &ReminderNotice) -> Result<(), NotifyError> {
        (**self).send_reminder(notice)
    }
}

/// Writes each rendered reminder to the log. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_reminder(&self, notice: &ReminderNotice) -> Result<(), NotifyError> {
        let message = ReminderMessage::render(notice);
        tracing::info!(
            task_id = %notice.task_id,
            recipient = %message.recipient,
            subject = %message.subject,
            body = %message.body,
            "reminder"
        );
        Ok(())
    }
}
