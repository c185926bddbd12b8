use async_trait::async_trait;
use lettre::{
    Message, SmtpTransport as LettreSmtpTransport, Transport,
    message::{MultiPart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};

use super::{EmailError, EmailTransport, OutgoingEmail, Sender};

const IMPLICIT_TLS_PORT: u16 = 465;

/// Reply codes a relay uses to refuse authentication.
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// Submits mail to an authenticated SMTP relay.
///
/// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: LettreSmtpTransport,
    host: String,
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl SmtpTransport {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self, EmailError> {
        let relay = if port == IMPLICIT_TLS_PORT {
            LettreSmtpTransport::relay(host)
        } else {
            LettreSmtpTransport::starttls_relay(host)
        };
        let builder = relay
            .map_err(|e| EmailError::Transport(format!("Failed to create SMTP relay: {e}")))?;

        let mailer = builder
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { mailer, host: host.to_string() })
    }
}

pub(crate) fn build_message(from: &Sender, email: &OutgoingEmail) -> Result<Message, EmailError> {
    let builder = Message::builder()
        .from(from.mailbox()?)
        .to(email.recipient()?)
        .subject(email.subject.clone())
        .message_id(None);

    let message = match &email.text {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(text.clone(), email.html.clone())),
        None => builder
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone()),
    };

    message.map_err(|e| EmailError::Transport(format!("Failed to build email: {e}")))
}

fn classify(error: SmtpError) -> EmailError {
    let code = error.status().map(|code| code.to_string());
    let message = error.to_string();

    let refused = code
        .as_deref()
        .is_some_and(|code| AUTH_FAILURE_CODES.contains(&code));

    if refused || message.to_ascii_lowercase().contains("authentication") {
        EmailError::Authentication(message)
    } else {
        EmailError::Transport(message)
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, from: &Sender, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        let message = build_message(from, email)?;
        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(|id| id.trim_matches(|c| c == '<' || c == '>').to_string());

        let mailer = self.mailer.clone();

        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| EmailError::Transport(format!("Task join error: {e}")))?
            .map_err(classify)?;

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Sender {
        Sender { name: "LMS".into(), address: "lms@example.com".into() }
    }

    fn email(text: Option<&str>) -> OutgoingEmail {
        OutgoingEmail {
            to: "ana@example.com".into(),
            name: "Ana".into(),
            subject: "Welcome".into(),
            html: "<p>Hi</p>".into(),
            text: text.map(str::to_string),
        }
    }

    fn rendered(message: &Message) -> String {
        String::from_utf8(message.formatted()).unwrap()
    }

    #[test]
    fn html_only_messages_are_single_part() {
        let message = build_message(&sender(), &email(None)).unwrap();
        let raw = rendered(&message);

        assert!(raw.contains("From: LMS <lms@example.com>"));
        assert!(raw.contains("To: Ana <ana@example.com>"));
        assert!(raw.contains("Subject: Welcome"));
        assert!(raw.contains("Content-Type: text/html"));
        assert!(!raw.contains("multipart/alternative"));

        let id = message.headers().get_raw("Message-ID").unwrap();
        assert!(id.starts_with('<') && id.ends_with('>') && id.contains('@'));
    }

    #[test]
    fn names_with_commas_are_quoted() {
        let sender = Sender { name: "Smith, LMS".into(), address: "lms@example.com".into() };
        let mut email = email(None);
        email.name = "Smith, Ana".into();

        let raw = rendered(&build_message(&sender, &email).unwrap());

        assert!(raw.contains("From: \"Smith, LMS\" <lms@example.com>"));
        assert!(raw.contains("To: \"Smith, Ana\" <ana@example.com>"));
    }

    #[test]
    fn text_bodies_make_an_alternative_part() {
        let message = build_message(&sender(), &email(Some("Hi"))).unwrap();

        assert!(rendered(&message).contains("multipart/alternative"));
    }

    #[test]
    fn invalid_recipients_fail_before_sending() {
        let mut bad = email(None);
        bad.to = "not an address".into();

        assert!(matches!(build_message(&sender(), &bad), Err(EmailError::Transport(_))));
    }

    #[test]
    fn transport_reports_its_name() {
        let transport = SmtpTransport::new("smtp.example.com", 587, "u", "p").unwrap();

        assert_eq!(transport.name(), "smtp");
        assert!(format!("{transport:?}").contains("smtp.example.com"));
    }
}
