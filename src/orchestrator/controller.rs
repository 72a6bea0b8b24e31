//! Session controller.
//!
//! Starts the poller, runs each user command as its own task, and tears
//! everything down on quit.

use crate::actions;
use crate::api::CampaignApi;
use crate::model::{ClientConfig, DashEvent};
use crate::poller::{spawn_poller, Refresher};
use crate::uploads::{self, UploadSlot};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Start { max_emails: Option<u32> },
    SendTest(String),
    Upload { slot: UploadSlot, path: Option<PathBuf> },
    UpdateContent { subject: String, body: String },
    DownloadTemplate(PathBuf),
    Refresh,
    Quit,
}

/// Run until `Quit` (or the command channel closes). Actions run
/// concurrently with polling and with each other; no ordering between them
/// is enforced.
pub(crate) async fn run_controller(
    api: Arc<dyn CampaignApi>,
    cfg: &ClientConfig,
    event_tx: UnboundedSender<DashEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let poller = spawn_poller(api.clone(), cfg.poll_interval, event_tx.clone());
    let refresher = poller.refresher();
    let mut actions = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                tracing::debug!(?cmd, "ui command");
                match cmd {
                    UiCommand::Quit => break,
                    UiCommand::Refresh => poller.refresh(),
                    other => {
                        let api = api.clone();
                        let tx = event_tx.clone();
                        let refresher = refresher.clone();
                        actions.spawn(async move {
                            dispatch(api.as_ref(), other, &tx, &refresher).await;
                        });
                    }
                }
            }
            Some(res) = actions.join_next(), if !actions.is_empty() => {
                if let Err(e) = res {
                    tracing::error!(error = %e, "action task failed");
                }
            }
        }
    }

    actions.abort_all();
    poller.shutdown().await;
    Ok(())
}

/// Run a single command to completion.
pub(crate) async fn dispatch(
    api: &dyn CampaignApi,
    cmd: UiCommand,
    tx: &UnboundedSender<DashEvent>,
    refresher: &Refresher,
) {
    match cmd {
        UiCommand::Start { max_emails } => {
            actions::start_campaign(api, max_emails, tx, refresher).await;
        }
        UiCommand::SendTest(email) => {
            actions::send_test(api, &email, tx).await;
        }
        UiCommand::Upload { slot, path } => {
            uploads::run_upload(api, slot, path.as_deref(), tx, refresher).await;
        }
        UiCommand::UpdateContent { subject, body } => {
            actions::update_content(api, &subject, &body, tx).await;
        }
        UiCommand::DownloadTemplate(dest) => {
            actions::download_template(api, &dest, tx).await;
        }
        UiCommand::Refresh => {
            refresher.refresh();
        }
        UiCommand::Quit => {}
    }
}
