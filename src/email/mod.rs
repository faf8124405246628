pub mod templates;

use std::future::Future;
use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send_welcome(&self, to_email: &str, username: &str, base_url: &str) -> Result<(), String> {
        let html = templates::render_welcome(username, base_url);
        self.send(to_email, "Welcome to the CRM", &html).await
    }

    pub async fn send_password_reset(&self, to_email: &str, reset_url: &str) -> Result<(), String> {
        let html = templates::render_password_reset(reset_url);
        self.send(to_email, "Password Reset - CRM", &html).await
    }

    pub async fn send_agent_invite(
        &self,
        to_email: &str,
        username: &str,
        organizer: &str,
        base_url: &str,
    ) -> Result<(), String> {
        let html = templates::render_agent_invite(username, organizer, base_url);
        self.send(to_email, "You are invited to be an agent", &html)
            .await
    }

    pub async fn send_lead_created(
        &self,
        to_email: &str,
        lead_name: &str,
        lead_url: &str,
    ) -> Result<(), String> {
        let html = templates::render_lead_created(lead_name, lead_url);
        self.send(to_email, "A lead has been created", &html).await
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}

/// Fire-and-forget send on a background task. Failures are logged only;
/// without a configured mailer the message is skipped.
pub fn dispatch<F, Fut>(mailer: Option<Arc<SystemMailer>>, kind: &'static str, send: F)
where
    F: FnOnce(Arc<SystemMailer>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    let Some(mailer) = mailer else {
        tracing::debug!(kind, "System SMTP not configured, skipping notification");
        return;
    };

    tokio::spawn(async move {
        if let Err(e) = send(mailer).await {
            tracing::error!(kind, "Failed to send notification: {e}");
        }
    });
}
