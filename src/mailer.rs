use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Failed to deliver mail to {recipient}: {reason}")]
    Delivery { recipient: String, reason: String },
}

/// Outgoing account e-mail.
pub trait Mailer: Send + Sync {
    fn send_verification(&self, recipient: &str, link: &str) -> Result<(), MailError>;
}

/// Writes the mail to the log instead of delivering it. Used when no SMTP
/// relay is configured.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_verification(&self, recipient: &str, link: &str) -> Result<(), MailError> {
        info!(recipient, link, "Verification e-mail (not delivered, no mail relay configured)");
        Ok(())
    }
}

pub fn verification_link(app_url: &str, token: &str) -> String {
    format!("{}/auth/verify?token={}", app_url.trim_end_matches('/'), token)
}
