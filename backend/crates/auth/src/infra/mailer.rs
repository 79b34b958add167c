//! Outbound Mail Relay
//!
//! HTTP implementation of the `Mailer` port against a Brevo-style
//! transactional mail API. Without an API key the mailer runs disabled:
//! sends are logged and reported as delivered, which keeps local
//! development working without a mail account.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::application::verification::Mailer;
use crate::error::{AuthError, AuthResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailBody {
    sender: MailAddress,
    to: Vec<MailAddress>,
    subject: String,
    html_content: String,
}

/// HTTP mail relay client
pub struct HttpMailer {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpMailer {
    pub fn new(
        api_url: String,
        api_key: String,
        sender_email: String,
        sender_name: Option<String>,
    ) -> AuthResult<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Internal(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            api_url,
            api_key: Some(api_key),
            sender_email,
            sender_name,
        })
    }

    /// A mailer that logs instead of sending
    pub fn disabled() -> Self {
        Self {
            http: Client::new(),
            api_url: String::new(),
            api_key: None,
            sender_email: "noreply@localhost".to_string(),
            sender_name: None,
        }
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(subject, "Mail relay disabled, skipping send");
            return Ok(());
        };

        let body = SendMailBody {
            sender: MailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![MailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject: subject.to_string(),
            html_content: html_body.to_string(),
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("api-key", api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("mail relay request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("mail relay returned {}", response.status()));
        }

        Ok(())
    }
}
