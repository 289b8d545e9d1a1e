use std::sync::{Arc, Mutex};

use super::{Notifier, ReminderMessage, ReminderNotice};
use crate::clock::Clock;
use crate::error::NotifyError;
use crate::storage::Database;

/// Queues rendered reminders in the `reminder_outbox` table.
///
/// Holds its own connection; the sweep that calls it reads through another.
pub struct OutboxNotifier {
    db: Mutex<Database>,
    clock: Arc<dyn Clock>,
}

impl OutboxNotifier {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db: Mutex::new(db),
            clock,
        }
    }
}

impl Notifier for OutboxNotifier {
    fn send_reminder(&self, notice: &ReminderNotice) -> Result<(), NotifyError> {
        let message = ReminderMessage::render(notice);
        let db = self.db.lock().unwrap_or_else(|p| p.into_inner());
        let id = db.append_outbox(
            &message.recipient,
            &message.subject,
            &message.body,
            self.clock.now(),
        )?;
        tracing::debug!(outbox_id = id, task_id = %notice.task_id, "reminder queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn queues_rendered_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 13, 18, 0).unwrap();
        let notifier = OutboxNotifier::new(
            Database::open_at(&path).unwrap(),
            Arc::new(ManualClock::new(at)),
        );

        notifier
            .send_reminder(&ReminderNotice {
                task_id: "t-1".into(),
                contact: "li@uni.edu".into(),
                display_name: "li".into(),
                title: "Essay".into(),
                description: None,
                remaining_text: "42 minutes".into(),
                due_text: "2025-03-14 14:00 UTC".into(),
            })
            .unwrap();

        let reader = Database::open_at(&path).unwrap();
        let entries = reader.list_outbox().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].recipient, "li@uni.edu");
        assert_eq!(entries[0].subject, "SmartEval - Task Reminder: Essay");
        assert!(entries[0].body.contains("Time Remaining: 42 minutes"));
        assert_eq!(entries[0].created_at, at);
    }
}
