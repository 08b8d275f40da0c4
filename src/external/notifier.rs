//! Notifier capability (§6, §4.8): `sms`/`email` dispatch invoked by the
//! Decision Processor when a rule fires. A send failure must never
//! propagate back into the hot path — it is logged and the decision still
//! completes (§7).

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("sms send failed: {0}")]
    Sms(String),
    #[error("email send failed: {0}")]
    Email(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn sms(&self, text: &str, to: &str) -> Result<(), NotifierError>;
    async fn email(&self, subject: &str, text: &str, to: &str) -> Result<(), NotifierError>;
}

/// Logging-only notifier: every send is recorded via `tracing` and always
/// succeeds. Used when `SMS_PROVIDER_*`/`SMTP_*` are unconfigured (§6).
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn sms(&self, text: &str, to: &str) -> Result<(), NotifierError> {
        info!(to, text, "SMS (logging notifier, no provider configured)");
        Ok(())
    }

    async fn email(&self, subject: &str, text: &str, to: &str) -> Result<(), NotifierError> {
        info!(to, subject, text, "Email (logging notifier, no provider configured)");
        Ok(())
    }
}

/// Best-effort SMS: swallow and log a notifier failure rather than
/// letting it interrupt decision processing (§7 "Notifier failure: log
/// warning, continue; decision still recorded").
pub async fn sms_best_effort(notifier: &dyn Notifier, text: &str, to: &str) {
    if let Err(e) = notifier.sms(text, to).await {
        warn!(error = %e, "sms dispatch failed, continuing");
    }
}

/// Best-effort email; see [`sms_best_effort`].
pub async fn email_best_effort(notifier: &dyn Notifier, subject: &str, text: &str, to: &str) {
    if let Err(e) = notifier.email(subject, text, to).await {
        warn!(error = %e, "email dispatch failed, continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_notifier_never_fails() {
        let notifier = LoggingNotifier;
        assert!(notifier.sms("test", "+15551234567").await.is_ok());
        assert!(notifier.email("subj", "body", "a@b.com").await.is_ok());
    }
}
