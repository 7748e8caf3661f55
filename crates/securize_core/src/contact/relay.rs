//! Outbound mail relay boundary.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Identifier the relay assigns to an accepted message.
pub type MessageId = String;

/// Fully rendered message handed to a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub reply_to: Option<String>,
}

/// Relay failure carrying the relay's human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailError {
    pub reason: String,
}

impl MailError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "mail relay failed: {}", self.reason)
    }
}

impl Error for MailError {}

/// Transport that delivers one message (SMTP or equivalent).
pub trait MailRelay {
    fn send(&self, mail: &OutgoingMail) -> Result<MessageId, MailError>;
}

impl<T: MailRelay + ?Sized> MailRelay for &T {
    fn send(&self, mail: &OutgoingMail) -> Result<MessageId, MailError> {
        (**self).send(mail)
    }
}

/// Relay that keeps messages in memory instead of delivering them.
///
/// Used for dry runs; can be told to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct OutboxRelay {
    sent: Mutex<Vec<(MessageId, OutgoingMail)>>,
    failure: Mutex<Option<String>>,
}

impl OutboxRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `send` fail with `reason`; `None` restores success.
    pub fn fail_with(&self, reason: Option<&str>) {
        *lock(&self.failure) = reason.map(str::to_string);
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<(MessageId, OutgoingMail)> {
        lock(&self.sent).clone()
    }
}

impl MailRelay for OutboxRelay {
    fn send(&self, mail: &OutgoingMail) -> Result<MessageId, MailError> {
        if let Some(reason) = lock(&self.failure).as_deref() {
            return Err(MailError::new(reason));
        }
        let id = format!("<{}@outbox.securize>", Uuid::new_v4());
        info!("event=mail_outbox module=contact status=ok message_id={id}");
        lock(&self.sent).push((id.clone(), mail.clone()));
        Ok(id)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
