//! One-shot user actions: start, send test, update content, download template.
//!
//! Each action reports through the event channel: optional optimistic state
//! events first, then exactly one notification. Validation failures notify
//! without touching the network.

use crate::api::{ApiError, CampaignApi};
use crate::model::{DashEvent, Notification, StartRequest};
use crate::poller::Refresher;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

pub const START_FALLBACK: &str = "Failed to start campaign";
pub const START_OK: &str = "Campaign started! Tracking progress...";
pub const TEST_FALLBACK: &str = "Failed to send test";
pub const TEST_OK: &str = "✓ Test email sent successfully!";
pub const TEST_EMPTY: &str = "Please enter an email address";
pub const CONTENT_FALLBACK: &str = "Failed to update content";
pub const CONTENT_OK: &str = "Email content updated";
pub const CONTENT_EMPTY: &str = "Please fill in both subject and body";
pub const DOWNLOAD_FALLBACK: &str = "Failed to download template";
pub const DEFAULT_TEMPLATE_FILE: &str = "template.csv";

fn notify(tx: &UnboundedSender<DashEvent>, n: Notification) -> bool {
    let ok = !n.is_error();
    let _ = tx.send(DashEvent::Notify(n));
    ok
}

/// Start a campaign run. The control goes to `Starting` immediately; only a
/// failure hands it back. On success the next poll shows the running state.
pub(crate) async fn start_campaign(
    api: &dyn CampaignApi,
    max_emails: Option<u32>,
    tx: &UnboundedSender<DashEvent>,
    refresher: &Refresher,
) -> bool {
    let _ = tx.send(DashEvent::StartRequested);
    match api.start_campaign(StartRequest { max_emails }).await {
        Ok(reply) => {
            tracing::info!(sent = ?reply.sent, "campaign start accepted");
            let message = reply
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| START_OK.to_string());
            notify(tx, Notification::success(message));
            refresher.refresh();
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "campaign start failed");
            let _ = tx.send(DashEvent::StartFailed);
            notify(tx, Notification::error(e.user_message(START_FALLBACK)))
        }
    }
}

/// Send one test email. The test control is disabled only while the request
/// is in flight and is re-enabled on every path.
pub(crate) async fn send_test(
    api: &dyn CampaignApi,
    email: &str,
    tx: &UnboundedSender<DashEvent>,
) -> bool {
    let email = email.trim();
    if email.is_empty() {
        return notify(tx, Notification::error(TEST_EMPTY));
    }

    let _ = tx.send(DashEvent::TestSendStarted);
    let res = api.send_test(email).await;
    let ok = res.is_ok();
    let _ = tx.send(DashEvent::TestSendFinished { ok });
    match res {
        Ok(_) => {
            tracing::info!(email, "test email sent");
            notify(tx, Notification::success(TEST_OK))
        }
        Err(e) => {
            tracing::warn!(email, error = %e, "test email failed");
            notify(tx, Notification::error(e.user_message(TEST_FALLBACK)))
        }
    }
}

pub(crate) async fn update_content(
    api: &dyn CampaignApi,
    subject: &str,
    body: &str,
    tx: &UnboundedSender<DashEvent>,
) -> bool {
    if subject.trim().is_empty() || body.trim().is_empty() {
        return notify(tx, Notification::error(CONTENT_EMPTY));
    }

    match api.update_content(subject, body).await {
        Ok(reply) => notify(
            tx,
            Notification::success(
                reply
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| CONTENT_OK.to_string()),
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "content update failed");
            notify(tx, Notification::error(e.user_message(CONTENT_FALLBACK)))
        }
    }
}

/// Fetch the recipient-list template and write it byte-for-byte to `dest`.
pub(crate) async fn download_template(
    api: &dyn CampaignApi,
    dest: &Path,
    tx: &UnboundedSender<DashEvent>,
) -> bool {
    let res = match api.download_template().await {
        Ok(bytes) => tokio::fs::write(dest, &bytes)
            .await
            .map_err(ApiError::from)
            .map(|_| bytes.len()),
        Err(e) => Err(e),
    };

    match res {
        Ok(len) => {
            tracing::info!(path = %dest.display(), bytes = len, "template saved");
            let _ = tx.send(DashEvent::FileSaved(absolute(dest)));
            notify(
                tx,
                Notification::success(format!("Template saved to {}", dest.display())),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "template download failed");
            notify(tx, Notification::error(e.user_message(DOWNLOAD_FALLBACK)))
        }
    }
}

fn absolute(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    std::env::current_dir()
        .map(|d| d.join(p))
        .unwrap_or_else(|_| p.to_path_buf())
}
