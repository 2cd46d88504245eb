//! Outgoing mail: account links and admin-composed messages

use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    /// Sender override; the transport's default address when `None`
    pub from: Option<String>,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl Mail {
    pub fn new(to: &str, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self { from: None, to: to.to_string(), subject: subject.into(), text: text.into(), html: None }
    }

    pub fn verification(to: &str, public_url: &str, token: &str) -> Self {
        Self::new(
            to,
            "Verify your email",
            format!("Confirm your address by opening {public_url}/verify-email?token={token}"),
        )
    }

    pub fn password_reset(to: &str, public_url: &str, token: &str) -> Self {
        Self::new(
            to,
            "Reset your password",
            format!("Choose a new password at {public_url}/reset-password?token={token}"),
        )
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), ApiError>;
}

/// Delivers mail through Amazon SES.
pub struct SesMailer {
    client: SesClient,
    from: String,
}

impl SesMailer {
    pub async fn new(region: Option<String>, from: String) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        Self { client: SesClient::new(&loader.load().await), from }
    }
}

fn content(data: &str) -> Result<Content, ApiError> {
    Content::builder()
        .data(data)
        .build()
        .map_err(|e| ApiError::Internal(format!("invalid mail content: {e}")))
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, mail: Mail) -> Result<(), ApiError> {
        let mut body = Body::builder();
        if !mail.text.is_empty() {
            body = body.text(content(&mail.text)?);
        }
        if let Some(html) = &mail.html {
            body = body.html(content(html)?);
        }
        let message = Message::builder().subject(content(&mail.subject)?).body(body.build()).build();

        self.client
            .send_email()
            .from_email_address(mail.from.as_deref().unwrap_or(&self.from))
            .destination(Destination::builder().to_addresses(&mail.to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(to = %mail.to, error = %e, "SES send failed");
                ApiError::Internal(format!("mail to {} not delivered", mail.to))
            })?;

        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail sent");
        Ok(())
    }
}

/// Writes mail to the log instead of delivering it. Used when no sender address is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), ApiError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, body = %mail.text, "Outgoing mail");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_mail_carries_link() {
        let mail = Mail::verification("a@b.io", "http://localhost:5173", "tok");
        assert_eq!(mail.to, "a@b.io");
        assert_eq!(mail.from, None);
        assert!(mail.text.contains("http://localhost:5173/verify-email?token=tok"));
    }

    #[test]
    fn test_content_requires_nothing_but_data() {
        assert_eq!(content("Hello").unwrap().data(), "Hello");
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_mail() {
        LogMailer.send(Mail::password_reset("a@b.io", "http://x", "t")).await.unwrap();
    }
}
