//! Alert delivery to the SMS messaging API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::NotifierConfig;
use crate::error::{Error, Result};

/// Header carrying the messaging API key
pub const API_KEY_HEADER: &str = "ApiKey";

/// Delivers an alert code to an external endpoint
///
/// Expected failures come back as [`DeliveryError`]; implementations must not
/// panic on them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `code` once
    async fn send(&self, code: &str) -> std::result::Result<(), DeliveryError>;
}

/// Notification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Request body could not be encoded
    #[error("Serialization error: {0}")]
    Marshal(String),

    /// Connection, DNS or timeout failure
    #[error("HTTP error: {0}")]
    Transport(String),

    /// Endpoint answered with something other than 200
    #[error("Messaging API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

/// Pattern-message request body
#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    #[serde(rename = "OtpId")]
    otp_id: &'a str,
    #[serde(rename = "ReplaceToken")]
    replace_token: Vec<String>,
    #[serde(rename = "SenderNumber")]
    sender_number: &'a str,
    #[serde(rename = "MobileNumber")]
    mobile_number: &'a str,
}

/// Sends alert codes as SMS pattern messages
pub struct SmsNotifier {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
    receiver: String,
}

impl SmsNotifier {
    /// Create a notifier with the configured request timeout
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
            receiver: config.receiver.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn send(&self, code: &str) -> std::result::Result<(), DeliveryError> {
        let payload = SmsRequest {
            otp_id: code,
            replace_token: Vec::new(),
            sender_number: &self.sender,
            mobile_number: &self.receiver,
        };
        let body = serde_json::to_vec(&payload).map_err(|e| DeliveryError::Marshal(e.to_string()))?;

        debug!(url = %self.api_url, code, "Sending SMS alert");

        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(code, "SMS alert sent");
        Ok(())
    }
}
