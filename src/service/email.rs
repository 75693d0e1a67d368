use crate::config::EmailConfig;
use crate::error::app_error::AppError;
use crate::models::user::Contact;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::collections::BTreeMap;

pub const CANCELLATION_TEMPLATE: &str = "cancellation";

/// A templated message; `context` holds the values substituted into `template`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Contact,
    pub subject: String,
    pub template: String,
    pub context: BTreeMap<String, String>,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, message: MailMessage) -> Result<(), AppError>;
}

struct RenderedMail {
    html: String,
    text: String,
}

pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn render(&self, message: &MailMessage) -> Result<RenderedMail, AppError> {
        match message.template.as_str() {
            CANCELLATION_TEMPLATE => {
                let provider = context_value(&message.context, "provider")?;
                let user = context_value(&message.context, "user")?;
                let date = context_value(&message.context, "date")?;

                Ok(RenderedMail {
                    html: self.generate_cancellation_html(provider, user, date),
                    text: self.generate_cancellation_text(provider, user, date),
                })
            }
            other => Err(AppError::email(format!("Unknown mail template: {}", other))),
        }
    }

    fn generate_cancellation_html(&self, provider: &str, user: &str, date: &str) -> String {
        format!(
            r##"
<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Agendamento cancelado</title>
</head>
<body style="margin:0;padding:0;background-color:#f4f4f7;font-family:Arial,Helvetica,sans-serif;color:#333333;">
    <table role="presentation" width="100%" cellspacing="0" cellpadding="0" border="0">
        <tr>
            <td align="center" style="padding:32px 16px;">
                <table role="presentation" width="560" cellspacing="0" cellpadding="0" border="0" style="background-color:#ffffff;border-radius:8px;">
                    <tr>
                        <td style="padding:32px;">
                            <h1 style="margin:0 0 16px;font-size:22px;color:#7159c1;">Agendamento cancelado</h1>
                            <p style="margin:0 0 16px;font-size:16px;line-height:24px;">Olá, <strong>{provider}</strong></p>
                            <p style="margin:0 0 16px;font-size:16px;line-height:24px;">Houve um novo cancelamento, confira os detalhes abaixo:</p>
                            <p style="margin:0 0 8px;font-size:16px;line-height:24px;"><strong>Cliente: </strong>{user}</p>
                            <p style="margin:0 0 16px;font-size:16px;line-height:24px;"><strong>Data/hora: </strong>{date}</p>
                            <p style="margin:0;font-size:14px;line-height:22px;color:#666666;">O horário está novamente disponível para novos agendamentos.</p>
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>
"##,
            provider = escape_html(provider),
            user = escape_html(user),
            date = escape_html(date),
        )
    }

    fn generate_cancellation_text(&self, provider: &str, user: &str, date: &str) -> String {
        format!(
            r#"Agendamento cancelado

Olá, {}

Houve um novo cancelamento, confira os detalhes abaixo:

Cliente: {}
Data/hora: {}

O horário está novamente disponível para novos agendamentos.
"#,
            provider, user, date
        )
    }

    fn build_message(&self, to: &Contact, subject: &str, html_body: &str, text_body: &str) -> Result<Message, AppError> {
        Message::builder()
            .from(mailbox(&self.config.from_name, &self.config.from_address).map_err(|e| AppError::email(format!("Invalid from address: {}", e)))?)
            .to(mailbox(&to.name, &to.email).map_err(|e| AppError::email(format!("Invalid to address: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text_body.to_string()))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html_body.to_string())),
            )
            .map_err(|e| AppError::email(format!("Failed to build email: {}", e)))
    }

    async fn send_email(&self, email: Message) -> Result<(), AppError> {
        let creds = Credentials::new(self.config.smtp_username.clone(), self.config.smtp_password.clone());

        let mailer = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| AppError::email(format!("Failed to create SMTP transport: {}", e)))?
            .credentials(creds)
            .port(self.config.smtp_port)
            .build();

        // lettre's SmtpTransport blocks
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::email(format!("Failed to spawn email sending task: {}", e)))?;

        result.map_err(|e| AppError::email(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send_mail(&self, message: MailMessage) -> Result<(), AppError> {
        let rendered = self.render(&message)?;

        let email = self.build_message(&message.to, &message.subject, &rendered.html, &rendered.text)?;

        if !self.config.enabled {
            tracing::warn!(template = %message.template, "Email service is disabled, skipping mail to {}", message.to.email);
            return Ok(());
        }

        self.send_email(email).await?;

        tracing::info!(template = %message.template, "Mail sent successfully to {}", message.to.email);
        Ok(())
    }
}

/// Display names go in verbatim; commas or quotes in a name never reach an address parser.
fn mailbox(name: &str, address: &str) -> Result<Mailbox, lettre::address::AddressError> {
    let name = Some(name.trim()).filter(|n| !n.is_empty()).map(str::to_string);
    Ok(Mailbox::new(name, address.parse()?))
}

fn context_value<'a>(context: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, AppError> {
    context
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| AppError::email(format!("Missing template variable: {}", key)))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
