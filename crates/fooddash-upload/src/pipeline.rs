//! Upload pipeline
//!
//! Every accepted file becomes an [`UploadTask`] in a slot that also owns the task's
//! cancellation token and preview handle. Exchange state changes go through
//! [`UploadTask::apply`] under one lock and are then published on a `watch` channel,
//! newest task first.
//!
//! Previews are rendered on the blocking pool and attached to the slot when ready. A
//! preview that finishes after its task is gone is released on the spot.
//!
//! Shutdown: [`UploadPipeline::shutdown`] (also run on drop) cancels every in-flight
//! exchange, releases every preview and empties the task list.

use std::sync::Arc;

use fooddash_core::models::{TaskEvent, TaskId, UploadFile, UploadStatus, UploadTask};
use fooddash_core::{
    AppError, ErrorMetadata, LogLevel, Notifier, PreviewHandle, PreviewProvider, ProgressFn, Toast,
    TransportError, UploadPolicy, UploadTransport, ValidationError,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

struct Slot {
    task: UploadTask,
    cancel: CancellationToken,
    preview: Option<PreviewHandle>,
}

/// State shared with the spawned exchanges.
struct Shared {
    slots: Mutex<Vec<Slot>>,
    tasks: watch::Sender<Vec<UploadTask>>,
    /// Previews still being rendered.
    rendering: watch::Sender<usize>,
    notifier: Arc<dyn Notifier>,
}

impl Shared {
    fn publish(&self, slots: &[Slot]) {
        self.tasks
            .send_replace(slots.iter().map(|slot| slot.task.clone()).collect());
    }

    /// Apply `event` to task `id`. Returns the new task if anything changed.
    fn apply(&self, id: TaskId, event: TaskEvent) -> Option<UploadTask> {
        let mut slots = self.slots.lock();
        let slot = slots.iter_mut().find(|slot| slot.task.id == id)?;

        if matches!(event, TaskEvent::Progress(_)) && slot.cancel.is_cancelled() {
            return None;
        }

        let next = slot.task.apply(event);
        if next == slot.task {
            return None;
        }
        slot.task = next.clone();
        self.publish(&slots);
        Some(next)
    }

    /// Mark task `id` cancelled and revoke its token. Returns false if the task is
    /// unknown or had already reached a terminal state.
    fn cancel(&self, id: TaskId) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.iter_mut().find(|slot| slot.task.id == id) else {
            return false;
        };

        let next = slot.task.apply(TaskEvent::Cancelled);
        if next == slot.task {
            return false;
        }
        slot.cancel.cancel();
        slot.task = next;
        self.publish(&slots);
        true
    }

    /// Hand `handle` to task `id`. The handle comes back if the task is gone.
    fn attach_preview(&self, id: TaskId, handle: PreviewHandle) -> Option<PreviewHandle> {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.iter_mut().find(|slot| slot.task.id == id) else {
            return Some(handle);
        };

        slot.task.preview = Some(handle.location().to_string());
        slot.preview = Some(handle);
        self.publish(&slots);
        None
    }
}

/// Counts a preview render from spawn until it is attached or released.
struct RenderGuard(Arc<Shared>);

impl RenderGuard {
    fn new(shared: Arc<Shared>) -> Self {
        shared.rendering.send_modify(|n| *n += 1);
        Self(shared)
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        self.0.rendering.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Outcome of [`UploadPipeline::submit_all`].
#[derive(Debug, Default)]
pub struct SubmitReport {
    pub accepted: Vec<TaskId>,
    pub rejected: Vec<ValidationError>,
}

pub struct UploadPipeline {
    transport: Arc<dyn UploadTransport>,
    previews: Arc<dyn PreviewProvider>,
    policy: UploadPolicy,
    folder: String,
    shared: Arc<Shared>,
    scope: CancellationToken,
}

impl UploadPipeline {
    pub fn new(
        transport: Arc<dyn UploadTransport>,
        previews: Arc<dyn PreviewProvider>,
        notifier: Arc<dyn Notifier>,
        policy: UploadPolicy,
        folder: impl Into<String>,
    ) -> Self {
        let (tasks, _) = watch::channel(Vec::new());
        let (rendering, _) = watch::channel(0);
        Self {
            transport,
            previews,
            policy,
            folder: folder.into(),
            shared: Arc::new(Shared {
                slots: Mutex::new(Vec::new()),
                tasks,
                rendering,
                notifier,
            }),
            scope: CancellationToken::new(),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Accept `file` and start uploading it. Rejected files never become tasks.
    /// Image previews are rendered in the background and show up on the task later.
    ///
    /// Must be called within a tokio runtime.
    pub fn submit(&self, file: UploadFile) -> Result<TaskId, AppError> {
        self.submit_at(file, 0)
    }

    /// Accept a batch, as a drop gesture does. The batch keeps its order and sits above
    /// previously submitted tasks. Each rejection is also posted as a warning toast.
    pub fn submit_all(&self, files: impl IntoIterator<Item = UploadFile>) -> SubmitReport {
        let mut report = SubmitReport::default();
        for file in files {
            let name = file.name.clone();
            match self.submit_at(file, report.accepted.len()) {
                Ok(id) => report.accepted.push(id),
                Err(AppError::Validation(rejection)) => {
                    self.shared
                        .notifier
                        .notify(Toast::warning("File rejected", rejection.to_string()));
                    report.rejected.push(rejection);
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Upload not started");
                }
            }
        }
        report
    }

    fn submit_at(&self, file: UploadFile, index: usize) -> Result<TaskId, AppError> {
        if let Err(rejection) = self.policy.validate(&file) {
            tracing::debug!(file = %file.name, reason = %rejection, "File rejected");
            return Err(rejection.into());
        }
        if self.scope.is_cancelled() {
            return Err(AppError::Internal(
                "Upload pipeline has been shut down".to_string(),
            ));
        }

        let task = UploadTask::new(&file, None);
        let id = task.id;
        let cancel = self.scope.child_token();

        {
            let mut slots = self.shared.slots.lock();
            let index = index.min(slots.len());
            slots.insert(
                index,
                Slot {
                    task,
                    cancel: cancel.clone(),
                    preview: None,
                },
            );
            self.shared.publish(&slots);
        }

        tracing::info!(task_id = %id, file = %file.name, size = file.size(), "Upload started");

        if file.is_image() {
            tokio::spawn(render_preview(
                RenderGuard::new(self.shared.clone()),
                self.previews.clone(),
                id,
                file.clone(),
            ));
        }

        tokio::spawn(run_exchange(
            self.shared.clone(),
            self.transport.clone(),
            id,
            file,
            self.folder.clone(),
            cancel,
        ));

        Ok(id)
    }

    /// Cancel the exchange but keep the task, marked as a cancelled failure.
    /// Returns false if the task is unknown or already finished.
    pub fn cancel(&self, id: TaskId) -> bool {
        if !self.shared.cancel(id) {
            return false;
        }
        tracing::info!(task_id = %id, "Upload cancelled");
        true
    }

    /// Drop a task, cancelling its exchange and releasing its preview. Idempotent.
    pub fn remove(&self, id: TaskId) -> bool {
        let slot = {
            let mut slots = self.shared.slots.lock();
            let Some(position) = slots.iter().position(|slot| slot.task.id == id) else {
                return false;
            };
            let slot = slots.remove(position);
            self.shared.publish(&slots);
            slot
        };

        slot.cancel.cancel();
        if let Some(handle) = slot.preview {
            self.previews.release(handle);
        }
        tracing::debug!(task_id = %id, "Task removed");
        true
    }

    /// Current tasks, newest first.
    pub fn tasks(&self) -> Vec<UploadTask> {
        self.shared.tasks.borrow().clone()
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        self.shared
            .tasks
            .borrow()
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<UploadTask>> {
        self.shared.tasks.subscribe()
    }

    /// Resolve once no task is in progress and no preview is still rendering.
    pub async fn wait_settled(&self) {
        let mut tasks = self.shared.tasks.subscribe();
        let mut rendering = self.shared.rendering.subscribe();
        let settled = tasks
            .wait_for(|tasks| tasks.iter().all(|task| task.status.is_terminal()))
            .await
            .is_ok()
            && rendering.wait_for(|pending| *pending == 0).await.is_ok();
        if !settled {
            tracing::debug!("Task channel closed while waiting");
        }
    }

    /// Cancel everything in flight and release every preview. Idempotent.
    pub fn shutdown(&self) {
        self.scope.cancel();

        let drained: Vec<Slot> = {
            let mut slots = self.shared.slots.lock();
            let drained = std::mem::take(&mut *slots);
            self.shared.publish(&slots);
            drained
        };
        if drained.is_empty() {
            return;
        }

        tracing::info!(tasks = drained.len(), "Upload pipeline shutting down");
        for slot in drained {
            slot.cancel.cancel();
            if let Some(handle) = slot.preview {
                self.previews.release(handle);
            }
        }
    }
}

impl Drop for UploadPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn render_preview(
    guard: RenderGuard,
    previews: Arc<dyn PreviewProvider>,
    id: TaskId,
    file: UploadFile,
) {
    let name = file.name.clone();
    let provider = previews.clone();
    let rendered = tokio::task::spawn_blocking(move || provider.acquire(&file)).await;

    let handle = match rendered {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            tracing::warn!(file = %name, error = %e, "Preview unavailable");
            return;
        }
        Err(e) => {
            tracing::warn!(file = %name, error = %e, "Preview task failed");
            return;
        }
    };

    if let Some(handle) = guard.0.attach_preview(id, handle) {
        tracing::debug!(task_id = %id, "Task gone before its preview was ready");
        previews.release(handle);
    }
}

async fn run_exchange(
    shared: Arc<Shared>,
    transport: Arc<dyn UploadTransport>,
    id: TaskId,
    file: UploadFile,
    folder: String,
    cancel: CancellationToken,
) {
    let progress: ProgressFn = {
        let shared = shared.clone();
        let cancel = cancel.clone();
        Arc::new(move |percent: f64| {
            if !cancel.is_cancelled() {
                shared.apply(id, TaskEvent::Progress(percent));
            }
        })
    };

    let result = transport
        .upload(&file, &folder, progress, cancel.clone())
        .await;

    let event = match result {
        Ok(response) if !cancel.is_cancelled() => TaskEvent::Completed {
            file_url: response.file_url,
        },
        Ok(_) | Err(TransportError::Cancelled) => TaskEvent::Cancelled,
        Err(_) if cancel.is_cancelled() => TaskEvent::Cancelled,
        Err(e) => {
            let err = AppError::from_upload_failure(&e);
            log_failure(id, &file.name, &err);
            TaskEvent::Failed {
                reason: err.client_message(),
            }
        }
    };

    let Some(task) = shared.apply(id, event) else {
        return;
    };
    match task.status {
        UploadStatus::Completed => {
            tracing::info!(task_id = %id, file = %task.name, "Upload completed");
            shared
                .notifier
                .notify(Toast::info("File uploaded", task.name.clone()));
        }
        UploadStatus::Failed if !task.cancelled => {
            let reason = task.error_message.clone().unwrap_or_default();
            shared.notifier.notify(Toast::error(
                "Upload failed",
                format!("{}: {}", task.name, reason),
            ));
        }
        _ => {}
    }
}

fn log_failure(id: TaskId, name: &str, err: &AppError) {
    match err.log_level() {
        LogLevel::Error => tracing::error!(task_id = %id, file = %name, error = %err, "Upload failed"),
        LogLevel::Warn => tracing::warn!(task_id = %id, file = %name, error = %err, "Upload failed"),
        LogLevel::Debug => tracing::debug!(task_id = %id, file = %name, error = %err, "Upload failed"),
    }
}
