use crate::api::{CampaignApi, HttpApi};
use crate::logging::{self, LogTarget};
use crate::model::{ClientConfig, DashEvent, NotificationKind};
use crate::orchestrator::{self, UiCommand};
use crate::poller::{self, Refresher};
use crate::state::{reduce, DashboardState, TemplateTab};
use crate::uploads::UploadSlot;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "campaign-dash",
    version,
    about = "Terminal dashboard for an email campaign backend"
)]
pub struct Cli {
    /// Base URL of the campaign backend
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Status poll interval
    #[arg(long, default_value = "5s")]
    pub poll_interval: humantime::Duration,

    /// Per-request timeout (default: none)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Email limit sent with "start" from the dashboard
    #[arg(long)]
    pub max_emails: Option<u32>,

    /// Default log filter; RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch mode, status and templates once and print them
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Poll and print a status summary on every change (no TUI)
    Watch,
    /// Print one template list
    Templates {
        #[arg(long, value_enum, default_value_t = TemplateKind::New)]
        kind: TemplateKind,
    },
    /// Upload a file to one of the fixed upload slots
    Upload {
        #[arg(value_enum)]
        slot: UploadSlot,
        /// File to upload; omitted means nothing is sent
        path: Option<PathBuf>,
    },
    /// Start a campaign run
    Start {
        #[arg(long)]
        max_emails: Option<u32>,
    },
    /// Send a single test email
    SendTest { email: String },
    /// Replace the campaign subject and body
    UpdateContent {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// Save the recipient CSV template
    DownloadTemplate {
        #[arg(long, short, default_value = crate::actions::DEFAULT_TEMPLATE_FILE)]
        output: PathBuf,
    },
    /// Write a snapshot to JSON and/or HTML files
    Export {
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long)]
        html: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateKind {
    New,
    Followup,
}

impl From<TemplateKind> for TemplateTab {
    fn from(k: TemplateKind) -> Self {
        match k {
            TemplateKind::New => TemplateTab::New,
            TemplateKind::Followup => TemplateTab::Followup,
        }
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval).max(Duration::from_millis(100)),
        request_timeout: args.timeout.map(Duration::from),
        user_agent: format!("campaign-dash/{}", env!("CARGO_PKG_VERSION")),
    }
}

fn uses_tui(args: &Cli) -> bool {
    cfg!(feature = "tui") && args.command.is_none()
}

pub async fn run(args: Cli) -> Result<()> {
    let target = if uses_tui(&args) {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    // Held until exit so buffered file logs are flushed.
    let _log_guard = match logging::init(target, &args.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };

    let cfg = build_config(&args);
    let api: Arc<dyn CampaignApi> = Arc::new(HttpApi::new(&cfg)?);
    tracing::debug!(base_url = %cfg.base_url, "client configured");

    let command = match args.command.clone() {
        Some(c) => c,
        None => return run_dashboard(args, cfg, api).await,
    };

    match command {
        Command::Status { json } => run_status(api, &cfg, json).await,
        Command::Watch => run_watch(api, &cfg).await,
        Command::Templates { kind } => run_templates(api, &cfg, kind).await,
        Command::Upload { slot, path } => {
            if path.is_none() {
                tracing::info!(slot = slot.label(), "no file selected; nothing to upload");
                return Ok(());
            }
            run_action(api, UiCommand::Upload { slot, path }).await
        }
        Command::Start { max_emails } => {
            run_action(
                api,
                UiCommand::Start {
                    max_emails: max_emails.or(args.max_emails),
                },
            )
            .await
        }
        Command::SendTest { email } => run_action(api, UiCommand::SendTest(email)).await,
        Command::UpdateContent { subject, body } => {
            run_action(api, UiCommand::UpdateContent { subject, body }).await
        }
        Command::DownloadTemplate { output } => {
            run_action(api, UiCommand::DownloadTemplate(output)).await
        }
        Command::Export { json, html } => run_export(api, &cfg, json, html).await,
    }
}

async fn run_dashboard(args: Cli, cfg: ClientConfig, api: Arc<dyn CampaignApi>) -> Result<()> {
    #[cfg(feature = "tui")]
    {
        crate::tui::run(args, cfg, api).await
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        let _ = args;
        run_watch(api, &cfg).await
    }
}

/// Run one action and print its notification. Error notifications become a
/// non-zero exit.
async fn run_action(api: Arc<dyn CampaignApi>, cmd: UiCommand) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<DashEvent>();

    orchestrator::dispatch(api.as_ref(), cmd, &evt_tx, &Refresher::detached()).await;
    drop(evt_tx);

    let mut failure = None;
    while let Some(ev) = evt_rx.recv().await {
        if let DashEvent::Notify(n) = ev {
            match n.kind {
                NotificationKind::Success => {
                    let _ = out_tx.send(OutputLine::Stdout(n.message));
                }
                // Reported once, by the caller's error exit.
                NotificationKind::Error => failure = Some(n.message),
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    match failure {
        Some(msg) => Err(anyhow::anyhow!(msg)),
        None => Ok(()),
    }
}

async fn run_status(api: Arc<dyn CampaignApi>, cfg: &ClientConfig, json: bool) -> Result<()> {
    let snap = poller::fetch_snapshot(api.as_ref(), &cfg.base_url).await;
    let (out_tx, out_handle) = spawn_output_writer();

    if json {
        let out = serde_json::to_string_pretty(&snap)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let state = crate::export::state_from_snapshot(&snap);
        for line in crate::text_summary::build_text_summary(&state).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    if snap.status.is_none() {
        return Err(anyhow::anyhow!("status unavailable from {}", cfg.base_url));
    }
    Ok(())
}

async fn run_templates(
    api: Arc<dyn CampaignApi>,
    cfg: &ClientConfig,
    kind: TemplateKind,
) -> Result<()> {
    let snap = poller::fetch_snapshot(api.as_ref(), &cfg.base_url).await;
    if snap.templates.is_none() {
        return Err(anyhow::anyhow!("templates unavailable from {}", cfg.base_url));
    }
    let state = DashboardState {
        template_tab: kind.into(),
        ..crate::export::state_from_snapshot(&snap)
    };
    let (out_tx, out_handle) = spawn_output_writer();
    for line in crate::export::template_lines(&state) {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_export(
    api: Arc<dyn CampaignApi>,
    cfg: &ClientConfig,
    json: Option<PathBuf>,
    html: Option<PathBuf>,
) -> Result<()> {
    if json.is_none() && html.is_none() {
        return Err(anyhow::anyhow!("export needs --json and/or --html"));
    }
    let snap = poller::fetch_snapshot(api.as_ref(), &cfg.base_url).await;
    let (out_tx, out_handle) = spawn_output_writer();

    if let Some(p) = json.as_deref() {
        crate::export::export_json(p, &snap).context("JSON export failed")?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Exported JSON: {}", p.display())));
    }
    if let Some(p) = html.as_deref() {
        crate::export::export_html(p, &snap).context("HTML export failed")?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Exported HTML: {}", p.display())));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Line-mode dashboard: poll until Ctrl-C, printing the summary whenever
/// the status changes.
async fn run_watch(api: Arc<dyn CampaignApi>, cfg: &ClientConfig) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<DashEvent>();
    let poller = poller::spawn_poller(api, cfg.poll_interval, evt_tx);

    let mut state = DashboardState::default();
    let mut last_printed: Option<Vec<String>> = None;

    loop {
        tokio::select! {
            ev = evt_rx.recv() => {
                let Some(ev) = ev else { break };
                let print = matches!(ev, DashEvent::StatusLoaded(_) | DashEvent::ModeLoaded(_));
                if let DashEvent::FetchFailed { resource, message } = &ev {
                    let _ = out_tx.send(OutputLine::Stderr(format!(
                        "{} fetch failed: {message}",
                        resource.as_str()
                    )));
                }
                state = reduce(state, ev);
                if print && state.status.is_some() {
                    let lines = crate::text_summary::build_text_summary(&state).lines;
                    if last_printed.as_ref() != Some(&lines) {
                        let _ = out_tx.send(OutputLine::Stdout(String::new()));
                        for line in &lines {
                            let _ = out_tx.send(OutputLine::Stdout(line.clone()));
                        }
                        last_printed = Some(lines);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.shutdown().await;
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
