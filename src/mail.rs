//! Outgoing mail.
//!
//! Messages are rendered here and handed to a [`MailTransport`]. The
//! shipped transport spools each message as one JSON line for a relay to
//! deliver. Send failures never propagate: every send returns a
//! [`MailReceipt`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MailConfig;
use crate::error::Result;
use crate::model::Task;
use crate::storage;

/// A fully rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub message_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
}

/// Delivery backend.
pub trait MailTransport {
    fn send(&mut self, mail: &OutgoingMail) -> Result<()>;
}

/// Appends messages as JSONL to a spool file.
pub struct SpoolTransport {
    path: PathBuf,
}

impl SpoolTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MailTransport for SpoolTransport {
    fn send(&mut self, mail: &OutgoingMail) -> Result<()> {
        storage::append_jsonl(&self.path, mail)
    }
}

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailReceipt {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Mailer {
    transport: Box<dyn MailTransport>,
    settings: MailConfig,
}

impl Mailer {
    pub fn new(transport: Box<dyn MailTransport>, settings: MailConfig) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Spool to the configured outbox, or `default_outbox` when unset.
    pub fn spool(settings: MailConfig, default_outbox: PathBuf) -> Self {
        let path = settings.outbox.clone().unwrap_or(default_outbox);
        Self::new(Box::new(SpoolTransport::new(path)), settings)
    }

    pub fn settings(&self) -> &MailConfig {
        &self.settings
    }

    pub fn send_verification_email(&mut self, to: &str, token: &str) -> MailReceipt {
        let url = self.settings.verify_url(token);
        let html = format!(
            "<h1>Email Doğrulama</h1>\n\
             <p>Görev Planlayıcı hesabınızı doğrulamak için aşağıdaki bağlantıya tıklayın:</p>\n\
             <p><a href=\"{url}\">Hesabımı Doğrula</a></p>\n\
             <p>Bağlantı çalışmazsa adresi tarayıcınıza kopyalayın:<br>{url}</p>"
        );
        self.deliver("verification", to, "Email Adresinizi Doğrulayın", html)
    }

    pub fn send_task_notification(&mut self, to: &str, task: &Task) -> MailReceipt {
        let mut details = format!(
            "<strong>Tarih:</strong> {}<br>\n<strong>Saat:</strong> {}<br>\n<strong>Tür:</strong> {}<br>",
            task.date,
            escape_html(&task.time),
            task.task_type
        );
        if !task.description.is_empty() {
            details.push_str(&format!(
                "\n<strong>Açıklama:</strong> {}",
                escape_html(&task.description)
            ));
        }
        let html = format!(
            "<h1>Görev Hatırlatması</h1>\n<h2>{}</h2>\n<p>{}</p>",
            escape_html(&task.title),
            details
        );
        let subject = format!("Görev Hatırlatması: {}", task.title);
        self.deliver("task_notification", to, &subject, html)
    }

    pub fn send_notification_email(&mut self, to: &str, subject: &str, html: &str) -> MailReceipt {
        self.deliver("notification", to, subject, html.to_string())
    }

    fn deliver(&mut self, kind: &str, to: &str, subject: &str, html: String) -> MailReceipt {
        let mail = OutgoingMail {
            message_id: format!("<{}@dayplan>", Uuid::new_v4()),
            from: self.settings.from.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html,
            queued_at: Utc::now(),
            relay: self
                .settings
                .smtp_host
                .as_ref()
                .map(|host| format!("{host}:{}", self.settings.smtp_port)),
        };

        match self.transport.send(&mail) {
            Ok(()) => {
                tracing::debug!(kind, to, message_id = %mail.message_id, "mail queued");
                MailReceipt {
                    success: true,
                    message_id: Some(mail.message_id),
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(kind, to, error = %err, "mail sending failed");
                MailReceipt {
                    success: false,
                    message_id: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{DayKey, TaskType};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<OutgoingMail>>>,
        fail: bool,
    }

    impl MailTransport for Recorder {
        fn send(&mut self, mail: &OutgoingMail) -> Result<()> {
            if self.fail {
                return Err(Error::OperationFailed("relay unreachable".to_string()));
            }
            self.sent.lock().expect("lock").push(mail.clone());
            Ok(())
        }
    }

    fn mailer(recorder: &Recorder) -> Mailer {
        Mailer::new(Box::new(recorder.clone()), MailConfig::default())
    }

    #[test]
    fn verification_mail_embeds_link() {
        let recorder = Recorder::default();
        let receipt = mailer(&recorder).send_verification_email("a@b.co", "tok-1");
        assert!(receipt.success);
        assert!(receipt.message_id.is_some());

        let sent = recorder.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.co");
        assert!(sent[0].html.contains("http://localhost:3000/verify?token=tok-1"));
    }

    #[test]
    fn task_notification_lists_fields_and_optional_description() {
        let recorder = Recorder::default();
        let mut mailer = mailer(&recorder);
        let date: DayKey = "02.03".parse().expect("day key");
        let task = Task::new(date, "04:30", "Essay <draft>", TaskType::English);
        mailer.send_task_notification("a@b.co", &task);
        mailer.send_task_notification("a@b.co", &task.clone().with_description("page 4"));

        let sent = recorder.sent.lock().expect("lock");
        assert_eq!(sent[0].subject, "Görev Hatırlatması: Essay <draft>");
        assert!(sent[0].html.contains("02.03"));
        assert!(sent[0].html.contains("04:30"));
        assert!(sent[0].html.contains("İngilizce"));
        assert!(sent[0].html.contains("Essay &lt;draft&gt;"));
        assert!(!sent[0].html.contains("Açıklama"));
        assert!(sent[1].html.contains("page 4"));
    }

    #[test]
    fn transport_failure_becomes_failed_receipt() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let receipt = mailer(&recorder).send_notification_email("a@b.co", "Hi", "<p>x</p>");
        assert!(!receipt.success);
        assert!(receipt.message_id.is_none());
        assert!(receipt.error.as_deref().unwrap_or("").contains("relay unreachable"));
    }

    #[test]
    fn spool_transport_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("outbox.jsonl");
        let mut mailer = Mailer::spool(MailConfig::default(), path.clone());
        mailer.send_notification_email("a@b.co", "One", "1");
        mailer.send_notification_email("c@d.co", "Two", "2");

        let content = std::fs::read_to_string(&path).expect("read outbox");
        let lines: Vec<OutgoingMail> = content
            .lines()
            .map(|line| serde_json::from_str(line).expect("mail json"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].subject, "Two");
        assert_eq!(lines[1].to, "c@d.co");
    }
}
