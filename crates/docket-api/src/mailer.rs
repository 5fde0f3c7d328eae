use futures_util::future::BoxFuture;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// A fully rendered notification ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: Mailbox,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

pub trait MailTransport: Send + Sync {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// SMTP delivery over STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, credentials: Option<(String, String)>) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let mut builder = Message::builder().from(email.from).subject(email.subject);
            for to in &email.to {
                builder = builder.to(to.parse::<Mailbox>()?);
            }
            let message = builder.multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))?;

            self.transport.send(message).await?;
            Ok(())
        })
    }
}

/// Used when no SMTP host is configured: notifications are only logged.
pub struct LogMailer;

impl MailTransport for LogMailer {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            info!(
                to = %email.to.join(", "),
                subject = %email.subject,
                "SMTP not configured, notification not delivered"
            );
            Ok(())
        })
    }
}
