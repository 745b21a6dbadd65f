use crate::config::Settings;
use crate::signature::{self, SIGNATURE_HEADER};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Body of a backup callback
#[derive(Debug, Clone, Serialize)]
pub struct BackupRequest {
    pub args: Vec<String>,
}

impl BackupRequest {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Compact JSON body, exactly the bytes that get signed.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("failed to serialize backup request")
    }
}

#[derive(Debug, Clone)]
pub struct CallbackResponse {
    pub status: u16,
    pub body: String,
}

pub fn default_callback_url(settings: &Settings) -> String {
    format!("http://localhost:{}/backup", settings.port)
}

pub struct CallbackClient {
    client: Client,
    settings: Arc<Settings>,
}

impl CallbackClient {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn url(&self) -> String {
        if self.settings.callback_url.is_empty() {
            default_callback_url(&self.settings)
        } else {
            self.settings.callback_url.clone()
        }
    }

    /// Sign and POST a backup request. Non-2xx responses are returned as-is.
    pub async fn trigger(&self, args: Vec<String>) -> Result<CallbackResponse> {
        let url = self.url();
        let body = BackupRequest::new(args).to_body()?;
        let sig = signature::sign(&self.settings.callback_secret, &body);
        debug!("Sending {} byte callback to {}", body.len(), url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, sig)
            .body(body)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read callback response")?;
        info!("Callback {} answered {}", url, status);

        Ok(CallbackResponse {
            status: status.as_u16(),
            body,
        })
    }
}
