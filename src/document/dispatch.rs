use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::event::Notification;
use crate::transport::RawNotification;

use super::core::DocumentCore;

/// Notification handling that may call back into the transport, capture,
/// or walk several steps. Runs on the document worker, in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentWork {
    StepProgress,
    SlideChanged { physical_id: i32 },
    CloseRequested,
    ShuttingDown,
}

struct DispatchExecutor {
    owned: Option<Runtime>,
    handle: Handle,
}

impl DispatchExecutor {
    fn new() -> AppResult<Self> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self {
                owned: None,
                handle,
            });
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .thread_name("pvr-dispatch")
            .build()
            .map_err(|source| {
                AppError::io_with_context(source, "failed to start document dispatcher")
            })?;
        let handle = runtime.handle().clone();
        Ok(Self {
            owned: Some(runtime),
            handle,
        })
    }
}

/// Pumps a session's notifications and feeds the document worker.
///
/// The pump only classifies; window handles and the setup signal are
/// applied inline, everything else is queued for the single worker so
/// the per-slide rewind stays strictly serial.
pub(crate) struct DispatchRuntime {
    executor: DispatchExecutor,
    pump: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl DispatchRuntime {
    pub(crate) fn start(
        core: Arc<DocumentCore>,
        notifications: flume::Receiver<RawNotification>,
    ) -> AppResult<Self> {
        let executor = DispatchExecutor::new()?;
        let (work_tx, mut work_rx) = unbounded_channel();

        let worker_core = Arc::clone(&core);
        let worker = executor.handle.spawn_blocking(move || {
            while let Some(work) = work_rx.blocking_recv() {
                worker_core.handle_work(work);
            }
        });

        let pump = executor.handle.spawn(async move {
            let mut stream = notifications.into_stream();
            while let Some(raw) = stream.next().await {
                if !route(&core, raw, &work_tx) {
                    return;
                }
            }
        });

        Ok(Self {
            executor,
            pump: Some(pump),
            worker: Some(worker),
        })
    }

    pub(crate) fn shutdown(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        // the worker drains once the pump's work sender is dropped
        self.worker.take();
        if let Some(runtime) = self.executor.owned.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for DispatchRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn route(
    core: &DocumentCore,
    raw: RawNotification,
    work_tx: &UnboundedSender<DocumentWork>,
) -> bool {
    let work = match Notification::classify(raw.code, raw.param) {
        Notification::PrimaryWindow(window) => {
            core.assign_primary(window);
            return true;
        }
        Notification::SecondaryWindow(window) => {
            core.assign_secondary(window);
            return true;
        }
        Notification::StepProgress => DocumentWork::StepProgress,
        Notification::SlideChanged { physical_id } => DocumentWork::SlideChanged { physical_id },
        Notification::WindowClosedByUser => DocumentWork::CloseRequested,
        Notification::ShuttingDown => DocumentWork::ShuttingDown,
        Notification::Unrecognized { code, param } => {
            tracing::warn!(doc = core.tag(), code, param, "unknown notification dropped");
            return true;
        }
    };
    work_tx.send(work).is_ok()
}
