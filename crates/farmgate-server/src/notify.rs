//! Fire-and-forget webhook notifications for onboarding events.
//!
//! The webhook is best-effort by design: the application is already
//! persisted when the notification fires, and a delivery failure is logged,
//! never surfaced to the applicant.

use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Notification sink configuration. Absent `FARMGATE_NOTIFY_WEBHOOK_URL`
/// leaves the server without one and submissions skip this path entirely.
#[derive(Debug, Clone)]
pub struct NotifyState {
    client: reqwest::Client,
    webhook_url: String,
}

#[derive(Debug, Serialize)]
pub struct ApplicationNotice {
    pub application_id: Uuid,
    pub name: String,
    pub kind: String,
    pub email: String,
    pub geocoded: bool,
}

impl NotifyState {
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(webhook_url: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Posts the notice on a detached task and returns immediately.
    pub fn send_application_notice(&self, notice: ApplicationNotice) {
        let client = self.client.clone();
        let url = self.webhook_url.clone();
        tokio::spawn(async move {
            let result = client.post(&url).json(&notice).send().await;
            match result.and_then(reqwest::Response::error_for_status) {
                Ok(_) => {
                    tracing::info!(application_id = %notice.application_id, "application webhook delivered");
                }
                Err(e) => {
                    tracing::warn!(
                        application_id = %notice.application_id,
                        error = %e,
                        "application webhook delivery failed"
                    );
                }
            }
        });
    }
}
