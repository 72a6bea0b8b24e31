//! File uploads.
//!
//! Each upload slot posts a single file to its own endpoint. The slot table
//! is data, so adding a slot is one row, not one handler.

use crate::api::{ApiError, CampaignApi, UploadFile};
use crate::model::{DashEvent, Notification};
use crate::poller::Refresher;
use bytes::Bytes;
use clap::ValueEnum;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum UploadSlot {
    Csv,
    Pdf,
    Credentials,
    Token,
}

pub struct SlotSpec {
    pub slot: UploadSlot,
    pub endpoint: &'static str,
    pub label: &'static str,
}

pub const UPLOAD_SLOTS: &[SlotSpec] = &[
    SlotSpec {
        slot: UploadSlot::Csv,
        endpoint: "/api/upload-csv",
        label: "CSV",
    },
    SlotSpec {
        slot: UploadSlot::Pdf,
        endpoint: "/api/upload-pdf",
        label: "PDF",
    },
    SlotSpec {
        slot: UploadSlot::Credentials,
        endpoint: "/api/upload-credentials",
        label: "Credentials",
    },
    SlotSpec {
        slot: UploadSlot::Token,
        endpoint: "/api/upload-token",
        label: "Token",
    },
];

impl UploadSlot {
    pub fn spec(self) -> &'static SlotSpec {
        // Every variant has exactly one row; index matches declaration order.
        &UPLOAD_SLOTS[self as usize]
    }

    pub fn endpoint(self) -> &'static str {
        self.spec().endpoint
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }
}

/// Outcome of one upload attempt, before it becomes a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
}

impl UploadResult {
    pub fn notification(&self) -> Notification {
        if self.success {
            Notification::success(self.message.clone())
        } else {
            Notification::error(self.message.clone())
        }
    }
}

async fn read_selection(path: &Path) -> Result<UploadFile, ApiError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(UploadFile {
        file_name,
        bytes: Bytes::from(bytes),
    })
}

/// Upload the selected file for `slot`. `None` (or an empty path) means
/// nothing was selected: no request is made and `None` is returned.
pub async fn upload_file(
    api: &dyn CampaignApi,
    slot: UploadSlot,
    selection: Option<&Path>,
) -> Option<UploadResult> {
    let path = selection.filter(|p| !p.as_os_str().is_empty())?;
    let label = slot.label();

    let res = match read_selection(path).await {
        Ok(file) => api.upload(slot.endpoint(), file).await.map(|_| ()),
        Err(e) => Err(e),
    };

    Some(match res {
        Ok(()) => {
            tracing::info!(slot = label, path = %path.display(), "upload succeeded");
            UploadResult {
                success: true,
                message: format!("{label} uploaded successfully!"),
            }
        }
        Err(e) => {
            tracing::warn!(slot = label, error = %e, "upload failed");
            let message = match &e {
                ApiError::Http { .. } => e.user_message(&format!("Failed to upload {label}")),
                other => format!("Error uploading {label}: {other}"),
            };
            UploadResult {
                success: false,
                message,
            }
        }
    })
}

/// Upload, notify, and on success ask the poller for fresh status so the
/// presence indicators update before the next tick.
pub(crate) async fn run_upload(
    api: &dyn CampaignApi,
    slot: UploadSlot,
    selection: Option<&Path>,
    event_tx: &UnboundedSender<DashEvent>,
    refresher: &Refresher,
) -> Option<UploadResult> {
    let result = upload_file(api, slot, selection).await?;
    let _ = event_tx.send(DashEvent::Notify(result.notification()));
    if result.success {
        refresher.refresh();
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockApi, MockCall};
    use crate::poller::PollCommand;
    use std::io::Write;
    use tokio::sync::mpsc;

    fn temp_file(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn slot_table_matches_variants() {
        for (i, spec) in UPLOAD_SLOTS.iter().enumerate() {
            assert_eq!(spec.slot as usize, i);
            assert_eq!(spec.slot.endpoint(), spec.endpoint);
        }
        assert_eq!(UploadSlot::Credentials.endpoint(), "/api/upload-credentials");
        assert_eq!(UploadSlot::Token.label(), "Token");
    }

    #[tokio::test]
    async fn empty_selection_issues_no_request() {
        let api = MockApi::new();
        for spec in UPLOAD_SLOTS {
            assert!(upload_file(&api, spec.slot, None).await.is_none());
            assert!(upload_file(&api, spec.slot, Some(Path::new("")))
                .await
                .is_none());
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn each_slot_posts_to_its_endpoint() {
        let (_dir, path) = temp_file("emails.csv", b"email,name\na@b.co,A\n");
        let api = MockApi::new();
        for spec in UPLOAD_SLOTS {
            let r = upload_file(&api, spec.slot, Some(&path)).await.unwrap();
            assert!(r.success);
            assert_eq!(r.message, format!("{} uploaded successfully!", spec.label));
        }
        let endpoints: Vec<String> = api
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Upload {
                    endpoint,
                    file_name,
                } => {
                    assert_eq!(file_name, "emails.csv");
                    Some(endpoint)
                }
                _ => None,
            })
            .collect();
        let expected: Vec<String> = UPLOAD_SLOTS.iter().map(|s| s.endpoint.to_string()).collect();
        assert_eq!(endpoints, expected);
    }

    #[tokio::test]
    async fn server_error_message_is_shown_verbatim() {
        let (_dir, path) = temp_file("a.pdf", b"%PDF-1.4");
        let api = MockApi::new().with_ack(Err(ApiError::Http {
            status: 400,
            message: Some("Invalid file type. Please upload a PDF file".into()),
        }));
        let r = upload_file(&api, UploadSlot::Pdf, Some(&path))
            .await
            .unwrap();
        assert!(!r.success);
        assert_eq!(r.message, "Invalid file type. Please upload a PDF file");

        let api = MockApi::new().with_ack(Err(ApiError::Http {
            status: 500,
            message: None,
        }));
        let r = upload_file(&api, UploadSlot::Pdf, Some(&path))
            .await
            .unwrap();
        assert_eq!(r.message, "Failed to upload PDF");
    }

    #[tokio::test]
    async fn unreadable_file_is_a_transport_style_error() {
        let api = MockApi::new();
        let r = upload_file(
            &api,
            UploadSlot::Csv,
            Some(Path::new("/definitely/not/here.csv")),
        )
        .await
        .unwrap();
        assert!(!r.success);
        assert!(r.message.starts_with("Error uploading CSV: "));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn success_refreshes_status_failure_does_not() {
        let (_dir, path) = temp_file("credentials.json", b"{}");
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let refresher = Refresher::from_sender(cmd_tx);

        let api = MockApi::new();
        run_upload(&api, UploadSlot::Credentials, Some(&path), &event_tx, &refresher).await;
        assert_eq!(cmd_rx.try_recv().ok(), Some(PollCommand::Refresh));
        match event_rx.try_recv().unwrap() {
            DashEvent::Notify(n) => assert_eq!(n.message, "Credentials uploaded successfully!"),
            other => panic!("unexpected {other:?}"),
        }

        let api = MockApi::new().with_ack(Err(ApiError::Http {
            status: 400,
            message: None,
        }));
        run_upload(&api, UploadSlot::Credentials, Some(&path), &event_tx, &refresher).await;
        assert!(cmd_rx.try_recv().is_err());
        match event_rx.try_recv().unwrap() {
            DashEvent::Notify(n) => assert!(n.is_error()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
