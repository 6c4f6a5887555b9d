use serde::{Deserialize, Serialize};

/// Outbound message for a rep. Delivery is best effort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient_rep_id: String,
    pub subject: String,
    pub body: String,
}

/// Side effects produced by a lifecycle transition.
///
/// Activities are written inside the same transaction as the state change.
/// Notifications are returned to the caller and sent only after commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RecordActivity { title: String, description: String },
    Notify(Notification),
}

impl Effect {
    pub fn activity(title: impl Into<String>, description: impl Into<String>) -> Self {
        Effect::RecordActivity {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn notify(
        recipient_rep_id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Effect::Notify(Notification {
            recipient_rep_id: recipient_rep_id.into(),
            subject: subject.into(),
            body: body.into(),
        })
    }
}

/// Result of a committed operation plus the notifications still to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub notifications: Vec<Notification>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, notifications: Vec<Notification>) -> Self {
        Self {
            value,
            notifications,
        }
    }

    pub fn quiet(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    pub fn into_parts(self) -> (T, Vec<Notification>) {
        (self.value, self.notifications)
    }
}
