use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail. Delivery itself is someone else's job: we either log
/// the message or hand it to an HTTP relay.
pub enum Mailer {
    Log,
    Webhook { client: reqwest::Client, url: String },
}

impl Mailer {
    pub fn from_webhook(url: Option<String>) -> Self {
        match url {
            Some(url) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()
                    .unwrap_or_default();
                Mailer::Webhook { client, url }
            }
            None => Mailer::Log,
        }
    }

    pub async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        match self {
            Mailer::Log => {
                tracing::info!(to = %mail.to, subject = %mail.subject, "mail (log only)");
                Ok(())
            }
            Mailer::Webhook { client, url } => {
                let response = client.post(url).json(mail).send().await?;
                if !response.status().is_success() {
                    return Err(MailError::Rejected(response.status().as_u16()));
                }
                Ok(())
            }
        }
    }

    /// Send without letting a failure reach the caller
    pub async fn send_best_effort(&self, mail: OutgoingMail) {
        if let Err(e) = self.send(&mail).await {
            tracing::warn!(to = %mail.to, subject = %mail.subject, error = %e, "mail delivery failed, continuing");
        }
    }
}

pub fn welcome_mail(name: &str, email: &str) -> OutgoingMail {
    OutgoingMail {
        to: email.to_string(),
        subject: "Welcome to EtherXWord".to_string(),
        body: format!("Hi {},\n\nYour EtherXWord account is ready. Happy writing!", name),
    }
}

pub fn invitation_mail(to: &str, sender_name: &str, title: &str, permission: &str, message: &str) -> OutgoingMail {
    let mut body = format!(
        "{} invited you to {} \"{}\" on EtherXWord.",
        sender_name,
        if permission == "edit" { "edit" } else { "view" },
        title
    );
    if !message.trim().is_empty() {
        body.push_str(&format!("\n\nMessage: {}", message.trim()));
    }
    body.push_str("\n\nOpen your notifications to accept or decline.");

    OutgoingMail {
        to: to.to_string(),
        subject: format!("{} shared \"{}\" with you", sender_name, title),
        body,
    }
}
