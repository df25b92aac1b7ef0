//! Backend actor
//!
//! Owns the download worker and everything it shares with it: the active
//! target set, the stop flags, and the stop channel. The GUI talks to it
//! exclusively through `BackendCommand`/`BackendEvent` channels, so no
//! download state ever lives on the UI side.

use super::messages::{BackendCommand, BackendEvent};
use crate::downloader::runner::{self, WorkerEvent};
use crate::downloader::session::{new_active_targets, ActiveTargets, SessionFlags};
use crate::downloader::{DownloadOutcome, DownloadRequest};
use crate::utils::error::Mp3LoaderError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::UnboundedSender<BackendEvent>,

    targets: ActiveTargets,
    flags: Arc<SessionFlags>,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl BackendActor {
    pub fn new(
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::UnboundedSender<BackendEvent>,
    ) -> Self {
        Self {
            receiver,
            sender,
            targets: new_active_targets(),
            flags: Arc::new(SessionFlags::new()),
            stop_tx: None,
            worker: None,
        }
    }

    pub async fn run(mut self) {
        info!("BackendActor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                BackendCommand::StartDownload(request) => {
                    self.handle_start(request);
                }
                BackendCommand::Stop => {
                    self.handle_stop().await;
                }
                BackendCommand::Shutdown => {
                    info!("BackendActor shutting down");
                    self.handle_stop().await;
                    if let Some(worker) = self.worker.take() {
                        let _ = worker.await;
                    }
                    break;
                }
            }
        }
    }

    fn download_in_flight(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.is_finished())
            .unwrap_or(false)
    }

    fn handle_start(&mut self, request: DownloadRequest) {
        if self.download_in_flight() {
            warn!("StartDownload ignored: a download is already running");
            self.emit(BackendEvent::Log(
                "⚠ A download is already in progress".to_string(),
            ));
            return;
        }

        self.flags.reset();

        let (stop_tx, stop_rx) = mpsc::channel(1);
        self.stop_tx = Some(stop_tx);

        let (worker_tx, mut worker_rx) = mpsc::unbounded_channel::<WorkerEvent>();

        // Forward worker events to the GUI, translated into backend events.
        let forward_sender = self.sender.clone();
        tokio::spawn(async move {
            while let Some(event) = worker_rx.recv().await {
                let translated = match event {
                    WorkerEvent::Log(line) => BackendEvent::Log(line),
                    WorkerEvent::Progress(p) => BackendEvent::Progress {
                        fraction: p.fraction,
                        label: Some(p.label),
                    },
                    WorkerEvent::Fraction(fraction) => BackendEvent::Progress {
                        fraction: Some(fraction),
                        label: None,
                    },
                    WorkerEvent::CleanupFinished { deleted } => {
                        BackendEvent::CleanupFinished { deleted }
                    }
                };
                if forward_sender.send(translated).is_err() {
                    break;
                }
            }
        });

        let targets = Arc::clone(&self.targets);
        let flags = Arc::clone(&self.flags);
        let inner = tokio::spawn(async move {
            runner::run_download(request, targets, flags, stop_rx, worker_tx).await
        });
        self.worker = Some(supervise(inner, self.sender.clone()));
    }

    async fn handle_stop(&mut self) {
        if !self.download_in_flight() {
            return;
        }

        info!("Stop requested");
        self.flags.request_stop();
        if let Some(stop_tx) = self.stop_tx.take() {
            // The worker may have exited between the check and this send.
            let _ = stop_tx.send(()).await;
        }
    }

    fn emit(&self, event: BackendEvent) {
        let _ = self.sender.send(event);
    }
}

/// Turn the worker's result into exactly one terminal event.
///
/// A panicked worker (a poisoned lock, for instance) must still produce a
/// terminal event, or the UI would keep its controls disabled forever.
fn supervise(
    inner: JoinHandle<Result<DownloadOutcome, Mp3LoaderError>>,
    sender: mpsc::UnboundedSender<BackendEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let event = match inner.await {
            Ok(Ok(outcome)) => BackendEvent::Finished(outcome),
            Ok(Err(e)) => BackendEvent::Failed(e.to_string()),
            Err(e) => {
                error!("Download worker crashed: {}", e);
                BackendEvent::Failed(format!("download worker crashed: {}", e))
            }
        };
        let _ = sender.send(event);
    })
}

/// Channel pair plumbing for the GUI side.
pub struct BackendHandle {
    pub command_tx: mpsc::Sender<BackendCommand>,
    pub event_rx: mpsc::UnboundedReceiver<BackendEvent>,
}

/// Spawn the backend actor on the given runtime and hand the GUI its ends of
/// the channels.
pub fn spawn_backend(runtime: &tokio::runtime::Runtime) -> BackendHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let actor = BackendActor::new(command_rx, event_tx);
    runtime.spawn(actor.run());

    BackendHandle {
        command_tx,
        event_rx,
    }
}
