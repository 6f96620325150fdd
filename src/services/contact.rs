//! Contact form relay to the shop owner's inbox.

use std::sync::Arc;

use askama::Template;

use crate::config::ResendConfig;
use crate::error::{Error, Result};
use crate::integrations::{Mailer, OutgoingEmail};

#[derive(Clone, Debug, Default)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactEmailHtml<'a> {
    name: &'a str,
    email: &'a str,
    lines: Vec<&'a str>,
}

#[derive(Template)]
#[template(path = "email/contact.txt")]
struct ContactEmailText<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Clone)]
pub struct ContactService {
    mailer: Arc<dyn Mailer>,
    from: String,
    to: String,
}

impl ContactService {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { mailer, from: from.into(), to: to.into() }
    }

    pub fn from_config(mailer: Arc<dyn Mailer>, config: &ResendConfig) -> Self {
        Self::new(mailer, config.from.clone(), config.to.clone())
    }

    pub async fn send_message(&self, input: ContactMessage) -> Result<()> {
        let (name, email, message) = (input.name.trim(), input.email.trim(), input.message.trim());
        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err(Error::validation("All fields are required"));
        }
        self.mailer.send(self.compose(name, email, message)?).await
    }

    fn compose(&self, name: &str, email: &str, message: &str) -> Result<OutgoingEmail> {
        let html = ContactEmailHtml { name, email, lines: message.lines().collect() }.render()?;
        let text = ContactEmailText { name, email, message }.render()?;
        Ok(OutgoingEmail {
            from: self.from.clone(),
            to: vec![self.to.clone()],
            subject: format!("Contact message from {name}"),
            html,
            text: Some(text),
            reply_to: Some(email.to_string()),
        })
    }
}
