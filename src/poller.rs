//! Periodic status polling.
//!
//! The poller is an explicit task owned by whoever spawned it. Each tick
//! fires independent mode and status fetches; their results are sent as
//! [`DashEvent`]s in whatever order they complete. Fetch failures are logged
//! and reported but never stop the timer.

use crate::api::{ApiError, CampaignApi};
use crate::model::{DashEvent, Resource, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollCommand {
    Refresh,
    Shutdown,
}

/// Cloneable trigger for an immediate out-of-band poll.
#[derive(Debug, Clone, Default)]
pub(crate) struct Refresher {
    tx: Option<UnboundedSender<PollCommand>>,
}

impl Refresher {
    /// A refresher with no poller behind it (one-shot CLI commands).
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn from_sender(tx: UnboundedSender<PollCommand>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Returns false when no poller is listening.
    pub fn refresh(&self) -> bool {
        match &self.tx {
            Some(tx) => tx.send(PollCommand::Refresh).is_ok(),
            None => false,
        }
    }
}

pub(crate) struct PollerHandle {
    cmd_tx: UnboundedSender<PollCommand>,
    handle: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn refresher(&self) -> Refresher {
        Refresher::from_sender(self.cmd_tx.clone())
    }

    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(PollCommand::Refresh);
    }

    /// Stop the timer and wait for the task to exit. In-flight fetches are
    /// aborted and never report.
    pub async fn shutdown(mut self) {
        let _ = self.cmd_tx.send(PollCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        // Dropping a JoinHandle does not cancel the task.
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn the poll loop. The first tick fires immediately, and templates are
/// fetched once alongside it.
pub(crate) fn spawn_poller(
    api: Arc<dyn CampaignApi>,
    interval: Duration,
    event_tx: UnboundedSender<DashEvent>,
) -> PollerHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<PollCommand>();
    let handle = tokio::spawn(poll_loop(api, interval, event_tx, cmd_rx));
    PollerHandle {
        cmd_tx,
        handle: Some(handle),
    }
}

async fn poll_loop(
    api: Arc<dyn CampaignApi>,
    interval: Duration,
    event_tx: UnboundedSender<DashEvent>,
    mut cmd_rx: UnboundedReceiver<PollCommand>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inflight = JoinSet::new();

    spawn_fetch(&mut inflight, &api, &event_tx, Resource::Templates);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(&mut inflight, &api, &event_tx);
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(PollCommand::Refresh) => {
                    tracing::debug!("refresh requested");
                    poll_once(&mut inflight, &api, &event_tx);
                }
                Some(PollCommand::Shutdown) | None => break,
            },
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
        }
    }

    inflight.abort_all();
    tracing::debug!("poller stopped");
}

fn poll_once(
    inflight: &mut JoinSet<()>,
    api: &Arc<dyn CampaignApi>,
    event_tx: &UnboundedSender<DashEvent>,
) {
    spawn_fetch(inflight, api, event_tx, Resource::Mode);
    spawn_fetch(inflight, api, event_tx, Resource::Status);
}

fn spawn_fetch(
    inflight: &mut JoinSet<()>,
    api: &Arc<dyn CampaignApi>,
    event_tx: &UnboundedSender<DashEvent>,
    resource: Resource,
) {
    let api = api.clone();
    let tx = event_tx.clone();
    inflight.spawn(async move {
        let _ = tx.send(fetch_event(api.as_ref(), resource).await);
    });
}

/// Fetch one resource and wrap the outcome as an event.
pub(crate) async fn fetch_event(api: &dyn CampaignApi, resource: Resource) -> DashEvent {
    let res = match resource {
        Resource::Mode => api.fetch_mode().await.map(DashEvent::ModeLoaded),
        Resource::Status => api.fetch_status().await.map(DashEvent::StatusLoaded),
        Resource::Templates => api.fetch_templates().await.map(DashEvent::TemplatesLoaded),
    };
    res.unwrap_or_else(|e| failed(resource, e))
}

fn failed(resource: Resource, e: ApiError) -> DashEvent {
    tracing::warn!(resource = resource.as_str(), error = %e, "fetch failed");
    DashEvent::FetchFailed {
        resource,
        message: e.to_string(),
    }
}

/// Fetch everything once, concurrently. Individual failures leave the
/// corresponding field empty.
pub(crate) async fn fetch_snapshot(api: &dyn CampaignApi, base_url: &str) -> Snapshot {
    let (mode, status, templates) = tokio::join!(
        api.fetch_mode(),
        api.fetch_status(),
        api.fetch_templates()
    );
    Snapshot {
        fetched_at_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        base_url: base_url.to_string(),
        mode: mode
            .map_err(|e| tracing::warn!(error = %e, "mode fetch failed"))
            .ok(),
        status: status
            .map_err(|e| tracing::warn!(error = %e, "status fetch failed"))
            .ok(),
        templates: templates
            .map_err(|e| tracing::warn!(error = %e, "templates fetch failed"))
            .ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockApi, MockCall};
    use crate::model::CampaignStatus;

    async fn next_event(rx: &mut UnboundedReceiver<DashEvent>) -> DashEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn initial_poll_fetches_templates_mode_and_status() {
        let api = Arc::new(MockApi::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = spawn_poller(api.clone(), Duration::from_secs(3600), tx);

        let mut seen = (false, false, false);
        for _ in 0..3 {
            match next_event(&mut rx).await {
                DashEvent::ModeLoaded(_) => seen.0 = true,
                DashEvent::StatusLoaded(_) => seen.1 = true,
                DashEvent::TemplatesLoaded(_) => seen.2 = true,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(seen, (true, true, true));
        poller.shutdown().await;
        assert_eq!(api.count(|c| *c == MockCall::FetchTemplates), 1);
    }

    #[tokio::test]
    async fn failure_is_reported_and_polling_continues() {
        let api = Arc::new(
            MockApi::new().with_status(Err(ApiError::Transport("connection refused".into()))),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = spawn_poller(api.clone(), Duration::from_millis(20), tx);

        let mut failures = 0;
        while failures < 2 {
            if let DashEvent::FetchFailed { resource, message } = next_event(&mut rx).await {
                assert_eq!(resource, Resource::Status);
                assert_eq!(message, "connection refused");
                failures += 1;
            }
        }

        api.set_status(Ok(CampaignStatus {
            is_running: true,
            ..Default::default()
        }));
        loop {
            if let DashEvent::StatusLoaded(s) = next_event(&mut rx).await {
                assert!(s.is_running);
                break;
            }
        }
        poller.shutdown().await;
    }

    #[tokio::test]
    async fn mode_failure_does_not_block_status() {
        let api = Arc::new(
            MockApi::new().with_mode(Err(ApiError::Http {
                status: 500,
                message: None,
            })),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = spawn_poller(api.clone(), Duration::from_millis(20), tx);

        let (mut mode_failures, mut statuses) = (0, 0);
        while mode_failures < 2 || statuses < 2 {
            match next_event(&mut rx).await {
                DashEvent::FetchFailed { resource, .. } => {
                    assert_eq!(resource, Resource::Mode);
                    mode_failures += 1;
                }
                DashEvent::StatusLoaded(_) => statuses += 1,
                DashEvent::TemplatesLoaded(_) => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
        poller.shutdown().await;
        assert!(api.count(|c| *c == MockCall::FetchMode) >= 2);
    }

    #[tokio::test]
    async fn template_failure_is_reported_once() {
        let api = Arc::new(
            MockApi::new().with_templates(Err(ApiError::Transport("connection reset".into()))),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = spawn_poller(api.clone(), Duration::from_secs(3600), tx);

        let mut seen = (false, false, false);
        for _ in 0..3 {
            match next_event(&mut rx).await {
                DashEvent::FetchFailed { resource, message } => {
                    assert_eq!(resource, Resource::Templates);
                    assert_eq!(message, "connection reset");
                    seen.0 = true;
                }
                DashEvent::ModeLoaded(_) => seen.1 = true,
                DashEvent::StatusLoaded(_) => seen.2 = true,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(seen, (true, true, true));

        assert!(poller.refresher().refresh());
        for _ in 0..2 {
            assert!(!matches!(
                next_event(&mut rx).await,
                DashEvent::FetchFailed { .. }
            ));
        }
        poller.shutdown().await;
        assert_eq!(api.count(|c| *c == MockCall::FetchTemplates), 1);
    }

    #[tokio::test]
    async fn refresh_triggers_extra_poll() {
        let api = Arc::new(MockApi::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = spawn_poller(api.clone(), Duration::from_secs(3600), tx);

        for _ in 0..3 {
            next_event(&mut rx).await;
        }
        assert!(poller.refresher().refresh());
        for _ in 0..2 {
            next_event(&mut rx).await;
        }
        poller.shutdown().await;
        assert_eq!(api.count(|c| *c == MockCall::FetchStatus), 2);
    }

    #[tokio::test]
    async fn shutdown_stops_the_timer() {
        let api = Arc::new(MockApi::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = spawn_poller(api.clone(), Duration::from_millis(10), tx);
        next_event(&mut rx).await;
        poller.shutdown().await;

        let before = api.count(|c| *c == MockCall::FetchStatus);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.count(|c| *c == MockCall::FetchStatus), before);
    }

    #[test]
    fn detached_refresher_reports_no_listener() {
        assert!(!Refresher::detached().refresh());
    }
}
