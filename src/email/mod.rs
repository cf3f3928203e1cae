use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::shared::AppError;

/// Outbound email delivery. Invoked synchronously and treated as opaque; the
/// caller decides whether a failure is fatal.
#[async_trait]
pub trait Mailer {
    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError>;
}

/// SMTP mailer built from the environment
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// Returns `Ok(None)` when SMTP_HOST is not configured
    pub fn from_env() -> Result<Option<Self>, AppError> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };

        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);
        let from = std::env::var("SMTP_MAIL").map_err(|_| {
            AppError::Email("SMTP_MAIL must be set when SMTP_HOST is configured".to_string())
        })?;
        let password = std::env::var("SMTP_PASSWORD").map_err(|_| {
            AppError::Email("SMTP_PASSWORD must be set when SMTP_HOST is configured".to_string())
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .map_err(|e| AppError::Email(e.to_string()))?
            .port(port)
            .credentials(Credentials::new(from.clone(), password))
            .build();

        Ok(Some(Self { transport, from }))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Email(format!("Invalid sender address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Email(format!("Invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| AppError::Email(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        info!(to = %to, "Email sent");
        Ok(())
    }
}

/// Captured outbound email, for development and tests
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// In-memory mailer: captures messages instead of delivering them
pub struct InMemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl Default for InMemoryMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError> {
        debug!(to = %to, subject = %subject, "Captured outbound email");

        self.sent.lock().unwrap().push(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html,
        });

        Ok(())
    }
}

/// Renders the account-activation email body
pub fn activation_email_html(name: &str, activation_link: &str) -> String {
    format!(
        "<html>\
         <body style=\"font-family: sans-serif;\">\
         <h2>Welcome, {name}!</h2>\
         <p>Please confirm your email address to activate your account.</p>\
         <p><a href=\"{activation_link}\">Activate your account</a></p>\
         <p>This link expires in a few minutes. If you did not register, you can ignore this email.</p>\
         </body>\
         </html>"
    )
}
