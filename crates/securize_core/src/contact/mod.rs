//! Pentest request submission.
//!
//! # Responsibility
//! - Validate contact/pentest form data.
//! - Build the admin notification and the requester confirmation and hand
//!   them to a `MailRelay`.
//!
//! # Invariants
//! - At most one submission is outstanding per service; the slot is
//!   released on every exit path.
//! - Relay failures are surfaced with the relay's reason and never retried.
//! - Cancellation is observed before each send; a message already handed to
//!   the relay is not recalled.

mod relay;

pub use relay::{MailError, MailRelay, MessageId, OutboxRelay, OutgoingMail};

use crate::config::ContactConfig;
use crate::render::escape_html;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static TARGET_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+\S*$").expect("valid url regex"));

/// Form data of a pentest request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PentestRequest {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub company_email: String,
    pub billing_address: String,
    pub company_billing_email: String,
    pub target_url: String,
    pub application_name: String,
}

impl PentestRequest {
    /// Checks required fields and address shapes.
    pub fn validate(&self) -> Result<(), ContactError> {
        for (field, value) in self.labelled_fields() {
            if value.trim().is_empty() {
                return Err(ContactError::MissingField(field));
            }
        }
        for (field, value) in [
            ("companyEmail", self.company_email.as_str()),
            ("companyBillingEmail", self.company_billing_email.as_str()),
        ] {
            if !EMAIL_RE.is_match(value.trim()) {
                return Err(ContactError::InvalidEmail(field));
            }
        }
        if !TARGET_URL_RE.is_match(self.target_url.trim()) {
            return Err(ContactError::InvalidTargetUrl(self.target_url.clone()));
        }
        Ok(())
    }

    fn labelled_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("company", self.company.as_str()),
            ("companyEmail", self.company_email.as_str()),
            ("billingAddress", self.billing_address.as_str()),
            ("companyBillingEmail", self.company_billing_email.as_str()),
            ("targetUrl", self.target_url.as_str()),
            ("applicationName", self.application_name.as_str()),
        ]
    }
}

/// Submission errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    MissingField(&'static str),
    InvalidEmail(&'static str),
    InvalidTargetUrl(String),
    /// Another submission on the same service has not finished.
    SubmissionInFlight,
    Cancelled,
    Relay(MailError),
}

impl Display for ContactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is empty"),
            Self::InvalidEmail(field) => write!(f, "field `{field}` is not an e-mail address"),
            Self::InvalidTargetUrl(url) => write!(f, "target url `{url}` must be http(s)"),
            Self::SubmissionInFlight => write!(f, "a submission is already in progress"),
            Self::Cancelled => write!(f, "submission cancelled"),
            Self::Relay(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContactError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Relay(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MailError> for ContactError {
    fn from(value: MailError) -> Self {
        Self::Relay(value)
    }
}

/// Shared cancellation flag for one submission.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Message ids of a completed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub notification_id: MessageId,
    pub confirmation_id: MessageId,
}

/// Sends pentest requests through a relay.
pub struct ContactService<R: MailRelay> {
    relay: R,
    config: ContactConfig,
    in_flight: AtomicBool,
}

impl<R: MailRelay> ContactService<R> {
    pub fn new(relay: R, config: ContactConfig) -> Self {
        Self {
            relay,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Whether a submission is currently outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Validates `request` and sends the notification, then the confirmation.
    pub fn submit(
        &self,
        request: &PentestRequest,
        cancel: &CancelToken,
    ) -> Result<SubmissionReceipt, ContactError> {
        let _slot = InFlightSlot::acquire(&self.in_flight)?;
        request.validate()?;

        let notification = self.notification_mail(request);
        let confirmation = self.confirmation_mail(request);

        let notification_id = self.send_one("notification", &notification, cancel)?;
        let confirmation_id = self.send_one("confirmation", &confirmation, cancel)?;
        Ok(SubmissionReceipt {
            notification_id,
            confirmation_id,
        })
    }

    /// Builds the message addressed to the configured admin recipient.
    pub fn notification_mail(&self, request: &PentestRequest) -> OutgoingMail {
        let rows: String = request
            .labelled_fields()
            .iter()
            .map(|(label, value)| {
                format!(
                    "<tr><th>{}</th><td>{}</td></tr>\n",
                    escape_html(label),
                    escape_html(value.trim())
                )
            })
            .collect();
        OutgoingMail {
            to: self.config.admin_recipient.clone(),
            subject: format!("New Pentest Request from {}", request.company.trim()),
            html_body: format!("<table>\n{rows}</table>\n"),
            reply_to: Some(request.company_email.trim().to_string()),
        }
    }

    /// Builds the acknowledgement sent back to the requester.
    pub fn confirmation_mail(&self, request: &PentestRequest) -> OutgoingMail {
        OutgoingMail {
            to: request.company_email.trim().to_string(),
            subject: self.config.confirmation_subject.clone(),
            html_body: format!(
                "<p>Hello {},</p>\n<p>We received your pentest request for {} ({}).</p>\n",
                escape_html(request.first_name.trim()),
                escape_html(request.application_name.trim()),
                escape_html(request.target_url.trim())
            ),
            reply_to: None,
        }
    }

    fn send_one(
        &self,
        kind: &'static str,
        mail: &OutgoingMail,
        cancel: &CancelToken,
    ) -> Result<MessageId, ContactError> {
        if cancel.is_cancelled() {
            info!("event=contact_send module=contact status=cancelled kind={kind}");
            return Err(ContactError::Cancelled);
        }
        match self.relay.send(mail) {
            Ok(id) => {
                info!("event=contact_send module=contact status=ok kind={kind} message_id={id}");
                Ok(id)
            }
            Err(err) => {
                error!(
                    "event=contact_send module=contact status=error kind={kind} reason={}",
                    err.reason
                );
                Err(err.into())
            }
        }
    }
}

struct InFlightSlot<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightSlot<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ContactError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ContactError::SubmissionInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CancelToken, ContactError, ContactService, MailError, MailRelay, MessageId, OutboxRelay,
        OutgoingMail, PentestRequest,
    };
    use crate::config::ContactConfig;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::Mutex;
    use std::thread;

    fn request() -> PentestRequest {
        PentestRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            company: "Analytical <Engines>".to_string(),
            company_email: "ada@engines.example".to_string(),
            billing_address: "1 Difference St".to_string(),
            company_billing_email: "billing@engines.example".to_string(),
            target_url: "https://app.engines.example/login".to_string(),
            application_name: "Engine Portal".to_string(),
        }
    }

    fn config() -> ContactConfig {
        ContactConfig {
            admin_recipient: "requests@securize.example".to_string(),
            ..ContactConfig::default()
        }
    }

    #[test]
    fn submit_sends_notification_then_confirmation() {
        let service = ContactService::new(OutboxRelay::new(), config());
        let receipt = service.submit(&request(), &CancelToken::new()).unwrap();

        let sent = service.relay().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, receipt.notification_id);
        assert_eq!(sent[0].1.to, "requests@securize.example");
        assert_eq!(
            sent[0].1.subject,
            "New Pentest Request from Analytical <Engines>"
        );
        assert!(sent[0].1.html_body.contains("Analytical &lt;Engines&gt;"));
        assert_eq!(sent[0].1.reply_to.as_deref(), Some("ada@engines.example"));
        assert_eq!(sent[1].1.to, "ada@engines.example");
        assert!(!service.is_submitting());
    }

    #[test]
    fn invalid_request_is_rejected_before_sending() {
        let service = ContactService::new(OutboxRelay::new(), config());
        let mut bad = request();
        bad.company_email = "not-an-address".to_string();
        assert_eq!(
            service.submit(&bad, &CancelToken::new()),
            Err(ContactError::InvalidEmail("companyEmail"))
        );

        let mut bad = request();
        bad.target_url = "ftp://files.example".to_string();
        assert!(matches!(
            service.submit(&bad, &CancelToken::new()),
            Err(ContactError::InvalidTargetUrl(_))
        ));
        assert!(service.relay().sent().is_empty());
        assert!(!service.is_submitting());
    }

    #[test]
    fn relay_failure_surfaces_reason_without_retry() {
        let relay = OutboxRelay::new();
        relay.fail_with(Some("550 mailbox unavailable"));
        let service = ContactService::new(relay, config());

        let err = service.submit(&request(), &CancelToken::new()).unwrap_err();
        assert_eq!(
            err,
            ContactError::Relay(MailError::new("550 mailbox unavailable"))
        );
        assert!(!service.is_submitting());
    }

    #[test]
    fn cancelled_token_stops_before_first_send() {
        let service = ContactService::new(OutboxRelay::new(), config());
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            service.submit(&request(), &cancel),
            Err(ContactError::Cancelled)
        );
        assert!(service.relay().sent().is_empty());
    }

    struct GateRelay {
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl MailRelay for GateRelay {
        fn send(&self, _mail: &OutgoingMail) -> Result<MessageId, MailError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok("gate".to_string())
        }
    }

    #[test]
    fn second_submission_is_refused_while_first_is_outstanding() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let service = ContactService::new(
            GateRelay {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            },
            config(),
        );

        thread::scope(|scope| {
            let first = scope.spawn(|| service.submit(&request(), &CancelToken::new()));
            entered_rx.recv().unwrap();

            assert!(service.is_submitting());
            assert_eq!(
                service.submit(&request(), &CancelToken::new()),
                Err(ContactError::SubmissionInFlight)
            );

            release_tx.send(()).unwrap();
            entered_rx.recv().unwrap();
            release_tx.send(()).unwrap();
            assert!(first.join().unwrap().is_ok());
        });
        assert!(!service.is_submitting());
    }
}
