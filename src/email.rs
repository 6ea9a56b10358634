//! Outbound email for sign-in codes.
//!
//! Three modes:
//! 1. Send via Resend API (when an API key is configured)
//! 2. Dev mode: log the code instead of sending
//! 3. Disabled (no key, not dev): log a warning, deliver nothing

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Result of attempting to deliver a sign-in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    /// Email was sent successfully via Resend
    Sent,
    /// Dev mode: code was logged rather than emailed
    Logged,
    /// No API key available, nothing was delivered
    NoApiKey,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_email: String,
    dev_mode: bool,
    http_client: Client,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from_email: String, dev_mode: bool) -> Self {
        Self {
            api_key,
            from_email,
            dev_mode,
            http_client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
            config.dev_mode,
        )
    }

    /// Send a one-time sign-in code. In dev mode the code is logged so that
    /// local flows work without an email provider.
    pub async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<EmailSendResult> {
        if self.dev_mode {
            tracing::info!(to = %to_email, code = %code, "Dev mode: sign-in code (not emailed)");
            return Ok(EmailSendResult::Logged);
        }

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(to = %to_email, "No Resend API key configured, cannot send sign-in code");
            return Ok(EmailSendResult::NoApiKey);
        };

        let subject = "Your sign-in code".to_string();
        let text = format!(
            "Your sign-in code is:\n\n{}\n\nThis code expires in {} minutes and can be used once.\n\nIf you didn't request this, you can ignore this email.",
            code, expires_in_minutes
        );

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to_email],
            subject,
            text,
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to Resend API");
                AppError::Internal(format!("Email service error: {}", e))
            })?;

        if response.status().is_success() {
            let _result: ResendEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse Resend API response");
                AppError::Internal("Email service response error".into())
            })?;
            tracing::info!(to = %to_email, "Sign-in code email sent via Resend");
            Ok(EmailSendResult::Sent)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Resend API returned error");
            Err(AppError::Internal(format!(
                "Email service error: {} - {}",
                status, body
            )))
        }
    }
}
