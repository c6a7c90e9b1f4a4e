//! PDF batch workflow: a file queue plus one operation per tool.
//!
//! The real operations (merge, resize, compress) run on the blocking pool
//! through a [`PdfBackend`]; Excel export and the other `pdf-*` tools only
//! simulate work. State moves through [`PdfTaskState::on`].

use crate::artifacts::{Artifact, ArtifactHandle, ArtifactStore, DownloadOutcome, HandleSlot, SimulatedKind};
use crate::catalog::ToolDescriptor;
use crate::config::ToolboxConfig;
use crate::dispatch::PdfOperation;
use crate::error::{ToolboxError, ToolboxResult};
use crate::features::pdf_engine::PdfBackend;
use crate::ui::{node, Button as UiButton, Column as UiColumn, MediaPreview, Progress as UiProgress, Text as UiText};
use base64::Engine;
use log::{debug, info, warn};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

pub const PDF_MIME: &str = "application/pdf";
pub const EXCEL_ACK: &str = "Success! Your Excel file has been generated (Mock Demo).";
pub const GENERIC_ACK: &str = "Success! Your file has been processed (Mock Demo).";

/// A user-provided file. Content is shared so queued files can be handed to
/// a worker without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    content: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn from_path(path: &Path) -> ToolboxResult<Self> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(name, content))
    }

    pub fn from_base64(name: impl Into<String>, data: &str) -> ToolboxResult<Self> {
        // Accept data URIs as well as bare payloads.
        let payload = data.split_once(";base64,").map_or(data, |(_, rest)| rest);
        let content = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        Ok(Self::new(name, content))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size_bytes() as f64 / 1024.0 / 1024.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeOption {
    #[default]
    A4,
    Letter,
    /// Half size, boxes and content.
    Scale,
}

impl ResizeOption {
    pub const ALL: [ResizeOption; 3] = [ResizeOption::A4, ResizeOption::Letter, ResizeOption::Scale];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(ResizeOption::A4),
            "letter" => Some(ResizeOption::Letter),
            "scale" | "0.5" => Some(ResizeOption::Scale),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ResizeOption::A4 => "A4",
            ResizeOption::Letter => "Letter",
            ResizeOption::Scale => "Scale",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResizeOption::A4 => "A4 (595 x 842 pt)",
            ResizeOption::Letter => "Letter (612 x 792 pt)",
            ResizeOption::Scale => "Scale to 50%",
        }
    }

    /// Target page size in points, `None` for the scale option.
    pub fn page_size(self) -> Option<(f64, f64)> {
        match self {
            ResizeOption::A4 => Some((595.0, 842.0)),
            ResizeOption::Letter => Some((612.0, 792.0)),
            ResizeOption::Scale => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PdfTaskState {
    #[default]
    Idle,
    FilesSelected,
    Processing,
    ResultReady(Artifact),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfEvent {
    FilesAdded,
    RunStarted,
    Finished(Artifact),
    Errored(String),
    Reset,
}

impl PdfTaskState {
    pub fn on(self, event: PdfEvent) -> Self {
        use PdfTaskState::*;
        match (self, event) {
            (_, PdfEvent::Reset) => Idle,
            (Idle, PdfEvent::FilesAdded) => FilesSelected,
            (Processing, PdfEvent::Finished(artifact)) => ResultReady(artifact),
            (Processing, PdfEvent::Errored(reason)) => Failed(reason),
            (FilesSelected | ResultReady(_) | Failed(_), PdfEvent::RunStarted) => Processing,
            (state, _) => state,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, PdfTaskState::Processing)
    }
}

/// What a finished job produced, before a handle exists for it.
#[derive(Debug)]
pub enum PdfOutput {
    Document(Vec<u8>),
    Simulated(SimulatedKind),
}

/// Snapshot of everything a run needs, detached from the panel so the panel
/// can keep rendering while the job is in flight.
pub struct PdfJob {
    pub seq: u64,
    operation: PdfOperation,
    files: Vec<UploadedFile>,
    resize: ResizeOption,
    excel_delay: Duration,
    simulated_delay: Duration,
}

impl PdfJob {
    pub async fn execute<B: PdfBackend>(self, backend: Arc<B>) -> ToolboxResult<PdfOutput> {
        match self.operation {
            PdfOperation::Merge | PdfOperation::Resize | PdfOperation::Compress => {
                let PdfJob {
                    operation,
                    files,
                    resize,
                    ..
                } = self;
                tokio::task::spawn_blocking(move || transform(backend.as_ref(), operation, &files, resize))
                    .await
                    .map_err(|e| ToolboxError::service("pdf", format!("worker_failed:{e}")))?
            }
            PdfOperation::ToExcel => {
                tokio::time::sleep(self.excel_delay).await;
                Ok(PdfOutput::Simulated(SimulatedKind::Excel))
            }
            PdfOperation::Reader | PdfOperation::Simulated => {
                tokio::time::sleep(self.simulated_delay).await;
                Ok(PdfOutput::Simulated(SimulatedKind::Generic))
            }
        }
    }
}

fn transform<B: PdfBackend>(
    backend: &B,
    operation: PdfOperation,
    files: &[UploadedFile],
    resize: ResizeOption,
) -> ToolboxResult<PdfOutput> {
    let bytes = match operation {
        PdfOperation::Merge => {
            let mut merged = backend.create()?;
            for file in files {
                let doc = backend
                    .load(file.bytes())
                    .map_err(|e| ToolboxError::service("pdf", format!("{}: {}", file.name, e)))?;
                backend.append_pages(&mut merged, doc)?;
            }
            backend.save(merged, false)?
        }
        PdfOperation::Resize => {
            let first = files.first().ok_or(ToolboxError::EmptyInput)?;
            let mut doc = backend.load(first.bytes())?;
            match resize.page_size() {
                Some((width, height)) => backend.set_page_size(&mut doc, width, height)?,
                None => backend.scale_pages(&mut doc, 0.5)?,
            }
            backend.save(doc, false)?
        }
        PdfOperation::Compress => {
            let first = files.first().ok_or(ToolboxError::EmptyInput)?;
            let doc = backend.load(first.bytes())?;
            backend.save(doc, true)?
        }
        PdfOperation::ToExcel | PdfOperation::Reader | PdfOperation::Simulated => {
            return Ok(PdfOutput::Simulated(SimulatedKind::Generic));
        }
    };
    Ok(PdfOutput::Document(bytes))
}

/// A job started by [`PdfToolbox::start`]. Dropping it aborts the job.
struct PendingRun {
    seq: u64,
    outcome: oneshot::Receiver<ToolboxResult<PdfOutput>>,
    task: JoinHandle<()>,
}

impl Drop for PendingRun {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct PdfToolbox<B: PdfBackend> {
    tool: ToolDescriptor,
    operation: PdfOperation,
    backend: Arc<B>,
    files: Vec<UploadedFile>,
    state: PdfTaskState,
    resize: ResizeOption,
    preview: HandleSlot,
    result: HandleSlot,
    excel_delay: Duration,
    simulated_delay: Duration,
    // Bumped on every run and reset; a result carrying an older number is dropped.
    seq: u64,
    pending: Option<PendingRun>,
}

impl<B: PdfBackend> PdfToolbox<B> {
    pub fn new(
        tool: ToolDescriptor,
        operation: PdfOperation,
        backend: Arc<B>,
        store: Arc<dyn ArtifactStore>,
        config: &ToolboxConfig,
    ) -> Self {
        Self {
            tool,
            operation,
            backend,
            files: Vec::new(),
            state: PdfTaskState::Idle,
            resize: ResizeOption::default(),
            preview: HandleSlot::new(store.clone()),
            result: HandleSlot::new(store),
            excel_delay: config.excel_delay(),
            simulated_delay: config.simulated_delay(),
            seq: 0,
            pending: None,
        }
    }

    pub fn tool(&self) -> &ToolDescriptor {
        &self.tool
    }

    pub fn operation(&self) -> PdfOperation {
        self.operation
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn state(&self) -> &PdfTaskState {
        &self.state
    }

    pub fn preview(&self) -> Option<&ArtifactHandle> {
        self.preview.get()
    }

    pub fn resize_option(&self) -> ResizeOption {
        self.resize
    }

    pub fn set_resize_option(&mut self, option: ResizeOption) {
        self.resize = option;
    }

    fn transition(&mut self, event: PdfEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = state.on(event);
    }

    pub fn add_files(&mut self, files: Vec<UploadedFile>) -> ToolboxResult<()> {
        let Some(first) = files.first() else {
            return Ok(());
        };
        if self.operation == PdfOperation::Reader {
            self.preview.issue(&first.name, PDF_MIME, first.bytes())?;
        }
        info!("[pdf] {} queued {} file(s)", self.tool.id, files.len());
        self.files.extend(files);
        self.transition(PdfEvent::FilesAdded);
        Ok(())
    }

    pub fn remove_file(&mut self, index: usize) -> ToolboxResult<UploadedFile> {
        if index >= self.files.len() {
            return Err(ToolboxError::InvalidIndex {
                index,
                len: self.files.len(),
            });
        }
        Ok(self.files.remove(index))
    }

    /// Validates the queue and moves to `Processing`. The returned job runs
    /// without borrowing the panel; hand its output to [`Self::finish`].
    pub fn begin_run(&mut self) -> ToolboxResult<PdfJob> {
        if self.state.is_busy() {
            return Err(ToolboxError::Busy);
        }
        if self.files.is_empty() {
            return Err(ToolboxError::EmptyInput);
        }
        if self.operation == PdfOperation::Merge && self.files.len() < 2 {
            return Err(ToolboxError::InsufficientInput {
                required: 2,
                found: self.files.len(),
            });
        }
        self.result.release();
        self.seq += 1;
        self.transition(PdfEvent::RunStarted);
        info!(
            "[pdf] {} running {:?} on {} file(s)",
            self.tool.id,
            self.operation,
            self.files.len()
        );
        Ok(PdfJob {
            seq: self.seq,
            operation: self.operation,
            files: self.files.clone(),
            resize: self.resize,
            excel_delay: self.excel_delay,
            simulated_delay: self.simulated_delay,
        })
    }

    pub fn finish(&mut self, seq: u64, outcome: ToolboxResult<PdfOutput>) -> ToolboxResult<()> {
        if seq != self.seq || !self.state.is_busy() {
            debug!("[pdf] dropping stale result #{seq} (current #{})", self.seq);
            return Ok(());
        }
        let artifact = match outcome {
            Ok(PdfOutput::Document(bytes)) => {
                let name = format!("{}-result.pdf", self.tool.id);
                match self.result.issue(&name, PDF_MIME, &bytes) {
                    Ok(handle) => Artifact::Real(handle),
                    Err(e) => return self.fail(e),
                }
            }
            Ok(PdfOutput::Simulated(kind)) => Artifact::Simulated(kind),
            Err(e) => return self.fail(e),
        };
        info!("[pdf] {} finished", self.tool.id);
        self.transition(PdfEvent::Finished(artifact));
        Ok(())
    }

    fn fail(&mut self, err: ToolboxError) -> ToolboxResult<()> {
        warn!("[pdf] {} failed: {}", self.tool.id, err);
        self.transition(PdfEvent::Errored(err.user_message()));
        Err(err)
    }

    /// Runs the whole job in place, for callers that can wait for it.
    pub async fn run(&mut self) -> ToolboxResult<()> {
        let job = self.begin_run()?;
        let seq = job.seq;
        let outcome = job.execute(self.backend.clone()).await;
        self.finish(seq, outcome)
    }

    /// Starts the job on the runtime and returns while it is `Processing`.
    /// [`Self::sync`] picks up the outcome.
    pub fn start(&mut self) -> ToolboxResult<()> {
        self.sync();
        let job = self.begin_run()?;
        let seq = job.seq;
        let backend = self.backend.clone();
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = tx.send(job.execute(backend).await);
        });
        self.pending = Some(PendingRun {
            seq,
            outcome: rx,
            task,
        });
        Ok(())
    }

    /// Applies the outcome of a started job once it is available.
    pub fn sync(&mut self) {
        let Some(run) = self.pending.as_mut() else {
            return;
        };
        let outcome = match run.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Err(ToolboxError::service("pdf", "worker stopped without a result")),
        };
        let seq = run.seq;
        self.pending = None;
        // Failures land in the panel state; `finish` already logged them.
        let _ = self.finish(seq, outcome);
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.files.clear();
        self.preview.release();
        self.result.release();
        self.seq += 1;
        self.transition(PdfEvent::Reset);
    }

    pub fn download(&self) -> ToolboxResult<DownloadOutcome> {
        match &self.state {
            PdfTaskState::ResultReady(Artifact::Real(handle)) => Ok(DownloadOutcome::File {
                location: handle.location.clone(),
                suggested_name: handle.name.clone(),
            }),
            PdfTaskState::ResultReady(Artifact::Simulated(kind)) => Ok(DownloadOutcome::Acknowledged {
                message: match kind {
                    SimulatedKind::Excel => EXCEL_ACK.into(),
                    SimulatedKind::Generic => GENERIC_ACK.into(),
                },
            }),
            _ => Err(ToolboxError::NoResult),
        }
    }

    pub fn render(&self) -> Value {
        render_pdf_panel(self)
    }
}

fn render_pdf_panel<B: PdfBackend>(panel: &PdfToolbox<B>) -> Value {
    let mut children: Vec<Value> = Vec::new();

    if panel.operation == PdfOperation::Resize {
        children.push(node(UiText::new("Select Page Dimensions:").size(14.0)));
        for option in ResizeOption::ALL {
            children.push(node(
                UiButton::new(option.label(), "pdf_resize_option")
                    .id(option.key())
                    .selected(option == panel.resize),
            ));
        }
    }

    if let PdfTaskState::ResultReady(artifact) = &panel.state {
        let label = match artifact {
            Artifact::Simulated(SimulatedKind::Excel) => "Download Excel",
            _ => "Download PDF",
        };
        children.push(node(UiText::new("Ready to Download").size(18.0)));
        children.push(node(UiText::new("We've successfully processed your document.")));
        children.push(node(UiButton::new(label, "pdf_download").id("pdf_download")));
        children.push(node(UiButton::new("Start New Task", "pdf_reset").id("pdf_reset")));
        return node(UiColumn::new(children).padding(16));
    }

    let picker_label = if panel.files.is_empty() {
        "Click or drag PDF to start"
    } else {
        "Add more PDFs"
    };
    children.push(node(
        UiButton::new(picker_label, "pdf_add_files")
            .requires_file_picker(true)
            .accept(".pdf")
            .multiple(panel.operation.accepts_multiple_files()),
    ));

    for (index, file) in panel.files.iter().enumerate() {
        let line = format!("{} · {}", file.name, file.size_label());
        let id = format!("pdf_remove_{index}");
        children.push(node(UiText::new(&line).content_description("pdf_file")));
        children.push(node(UiButton::new("Remove", "pdf_remove_file").id(&id)));
    }

    if panel.operation == PdfOperation::Reader {
        if let Some(preview) = panel.preview.get() {
            let source = preview.location.to_string_lossy();
            children.push(node(MediaPreview::new("pdf", &source).title(&preview.name)));
        }
    } else if panel.state.is_busy() {
        children.push(node(UiProgress::new().text("Processing...").content_description("pdf_progress")));
    } else if !panel.files.is_empty() {
        let label = format!("Run {}", panel.tool.name);
        children.push(node(UiButton::new(&label, "pdf_run").id("pdf_run")));
    }

    if let PdfTaskState::Failed(reason) = &panel.state {
        let line = format!("Error: {reason}");
        children.push(node(UiText::new(&line).content_description("pdf_error")));
    }

    node(UiColumn::new(children).padding(16))
}
