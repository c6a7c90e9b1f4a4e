//! Video panel: prompt-to-video generation against a long-running remote job,
//! and the trim variant that hands the selected clip back after a delay.

use crate::artifacts::{ArtifactHandle, ArtifactStore, DownloadOutcome, HandleSlot};
use crate::catalog::ToolDescriptor;
use crate::config::ToolboxConfig;
use crate::dispatch::VideoVariant;
use crate::error::{ToolboxError, ToolboxResult};
use crate::features::pdf::UploadedFile;
use crate::features::progress::{ProgressFeed, ProgressTicker, VIDEO_PROGRESS_MESSAGES};
use crate::genai::{CredentialProvider, GenerativeService, VideoRequest};
use crate::ui::{node, Button as UiButton, Column as UiColumn, MediaPreview, Progress as UiProgress, Text as UiText, TextInput};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

pub const VIDEO_FILE_NAME: &str = "multitoolbox-video.mp4";
pub const GENERATION_FAILED: &str = "Video generation failed. Please try again.";
pub const TRIM_FAILED: &str = "Video processing failed. Please try again.";
pub const TRIM_PROGRESS: &str = "Optimizing video structure...";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationJobState {
    #[default]
    Idle,
    Submitted,
    Polling {
        attempts: u32,
    },
    Ready(ArtifactHandle),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Submitted,
    Polled,
    Completed(ArtifactHandle),
    Errored(String),
    Reset,
}

impl GenerationJobState {
    pub fn on(self, event: JobEvent) -> Self {
        use GenerationJobState::*;
        match (self, event) {
            (_, JobEvent::Reset) => Idle,
            (Idle | Ready(_) | Failed(_), JobEvent::Submitted) => Submitted,
            (Submitted, JobEvent::Polled) => Polling { attempts: 1 },
            (Polling { attempts }, JobEvent::Polled) => Polling {
                attempts: attempts.saturating_add(1),
            },
            (Submitted | Polling { .. }, JobEvent::Completed(handle)) => Ready(handle),
            (Submitted | Polling { .. }, JobEvent::Errored(reason)) => Failed(reason),
            (state, _) => state,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, GenerationJobState::Submitted | GenerationJobState::Polling { .. })
    }
}

fn video_mime(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        _ => "video/mp4",
    }
}

/// Bytes a finished job hands back; the panel turns them into a handle.
#[derive(Debug)]
struct VideoOutput {
    name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

#[derive(Debug)]
enum JobUpdate {
    Polled,
    Finished(ToolboxResult<VideoOutput>),
}

/// A job running on the runtime. Dropping it aborts the task and stops the
/// progress rotation.
struct RunningJob {
    updates: mpsc::UnboundedReceiver<JobUpdate>,
    task: JoinHandle<()>,
    _ticker: Option<ProgressTicker>,
}

impl Drop for RunningJob {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Everything the generation task needs, detached from the panel.
struct GenerationJob {
    service: Arc<dyn GenerativeService>,
    credentials: Arc<dyn CredentialProvider>,
    request: VideoRequest,
    poll_interval: Duration,
    max_poll_attempts: Option<u32>,
    updates: mpsc::UnboundedSender<JobUpdate>,
}

impl GenerationJob {
    async fn run(self) {
        let outcome = self.execute().await;
        // The panel may be gone already.
        let _ = self.updates.send(JobUpdate::Finished(outcome));
    }

    async fn execute(&self) -> ToolboxResult<VideoOutput> {
        if !self.credentials.has_selected_key().await {
            info!("[video] no API key selected, opening selection");
            // The user was just prompted; a failed selection is reported as is.
            self.credentials.open_select_key().await?;
        }

        let outcome = self.submit_and_poll().await;
        let rejected_key = matches!(&outcome, Err(err) if err.is_credential_error());
        if rejected_key {
            if let Err(e) = self.credentials.open_select_key().await {
                warn!("[video] key selection after failure: {e}");
            }
        }
        outcome
    }

    async fn submit_and_poll(&self) -> ToolboxResult<VideoOutput> {
        let mut operation = self.service.generate_videos(&self.request).await?;
        info!("[video] submitted {}", operation.name);

        let mut attempts: u32 = 0;
        while !operation.done {
            if let Some(limit) = self.max_poll_attempts {
                if attempts >= limit {
                    return Err(ToolboxError::PollLimitReached(attempts));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
            operation = self.service.poll_video_operation(&operation).await?;
            attempts += 1;
            debug!("[video] poll #{} done={}", attempts, operation.done);
            if self.updates.send(JobUpdate::Polled).is_err() {
                return Err(ToolboxError::service("video", "job abandoned"));
            }
        }

        let uri = operation
            .video_uri
            .ok_or_else(|| ToolboxError::service("gemini", "operation finished without a video"))?;
        let bytes = self.service.fetch_artifact(&uri).await?;
        Ok(VideoOutput {
            name: VIDEO_FILE_NAME.to_string(),
            mime: "video/mp4",
            bytes,
        })
    }
}

/// Video panel. Generation and trimming run as background tasks; the panel
/// picks up their progress in [`VideoToolbox::sync`], so the shell keeps
/// handling commands while a job is in flight.
pub struct VideoToolbox {
    tool: ToolDescriptor,
    variant: VideoVariant,
    service: Arc<dyn GenerativeService>,
    credentials: Arc<dyn CredentialProvider>,
    config: ToolboxConfig,
    state: GenerationJobState,
    prompt: String,
    video_file: Option<UploadedFile>,
    result: HandleSlot,
    progress: ProgressFeed,
    job: Option<RunningJob>,
}

impl VideoToolbox {
    pub fn new(
        tool: ToolDescriptor,
        variant: VideoVariant,
        service: Arc<dyn GenerativeService>,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn ArtifactStore>,
        config: &ToolboxConfig,
    ) -> Self {
        Self {
            tool,
            variant,
            service,
            credentials,
            config: config.clone(),
            state: GenerationJobState::Idle,
            prompt: String::new(),
            video_file: None,
            result: HandleSlot::new(store),
            progress: ProgressFeed::default(),
            job: None,
        }
    }

    pub fn variant(&self) -> VideoVariant {
        self.variant
    }

    pub fn state(&self) -> &GenerationJobState {
        &self.state
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn video_file(&self) -> Option<&UploadedFile> {
        self.video_file.as_ref()
    }

    pub fn progress_message(&self) -> Option<String> {
        self.progress.current()
    }

    fn transition(&mut self, event: JobEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = state.on(event);
    }

    /// Applies whatever the running job reported since the last call.
    pub fn sync(&mut self) {
        let Some(job) = self.job.as_mut() else {
            return;
        };
        let mut polls = 0;
        let mut finished = None;
        loop {
            match job.updates.try_recv() {
                Ok(JobUpdate::Polled) => polls += 1,
                Ok(JobUpdate::Finished(outcome)) => {
                    finished = Some(outcome);
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = Some(Err(ToolboxError::service("video", "job stopped without a result")));
                    break;
                }
            }
        }
        for _ in 0..polls {
            self.transition(JobEvent::Polled);
        }
        if let Some(outcome) = finished {
            self.job = None;
            self.progress.clear();
            self.complete(outcome);
        }
    }

    fn complete(&mut self, outcome: ToolboxResult<VideoOutput>) {
        let issued = outcome.and_then(|output| self.result.issue(&output.name, output.mime, &output.bytes));
        match issued {
            Ok(handle) => {
                info!("[video] {} ready at {}", self.tool.id, handle.location.display());
                self.transition(JobEvent::Completed(handle));
            }
            Err(err) => {
                warn!("[video] {} failed: {}", self.tool.id, err);
                let reason = if err.is_credential_error() {
                    err.user_message()
                } else if self.variant == VideoVariant::Trim {
                    TRIM_FAILED.to_string()
                } else {
                    GENERATION_FAILED.to_string()
                };
                self.transition(JobEvent::Errored(reason));
            }
        }
    }

    /// Starts a generation job and returns at once; the panel is busy until
    /// [`Self::sync`] sees the job finish.
    pub fn generate(&mut self, prompt: &str) -> ToolboxResult<()> {
        self.sync();
        if prompt.trim().is_empty() {
            return Err(ToolboxError::EmptyPrompt);
        }
        if self.state.is_busy() {
            return Err(ToolboxError::Busy);
        }
        self.prompt = prompt.to_string();
        self.result.release();
        self.transition(JobEvent::Submitted);

        let (tx, rx) = mpsc::unbounded_channel();
        let job = GenerationJob {
            service: self.service.clone(),
            credentials: self.credentials.clone(),
            request: VideoRequest::from_config(&self.config, &self.prompt),
            poll_interval: self.config.poll_interval(),
            max_poll_attempts: self.config.max_poll_attempts,
            updates: tx,
        };
        let task = tokio::spawn(job.run());
        let ticker = ProgressTicker::start(
            self.progress.clone(),
            &VIDEO_PROGRESS_MESSAGES,
            self.config.progress_interval(),
        );
        self.job = Some(RunningJob {
            updates: rx,
            task,
            _ticker: Some(ticker),
        });
        Ok(())
    }

    pub fn select_video(&mut self, file: UploadedFile) {
        info!("[video] selected {} ({})", file.name, file.size_label());
        self.video_file = Some(file);
    }

    /// Starts the trim job: after the configured delay the selected clip is
    /// handed back as the result.
    pub fn trim(&mut self) -> ToolboxResult<()> {
        self.sync();
        let file = self.video_file.clone().ok_or(ToolboxError::EmptyInput)?;
        if self.state.is_busy() {
            return Err(ToolboxError::Busy);
        }
        self.result.release();
        self.transition(JobEvent::Submitted);
        self.progress.set(TRIM_PROGRESS);

        let (tx, rx) = mpsc::unbounded_channel();
        let delay = self.config.trim_delay();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let output = VideoOutput {
                mime: video_mime(&file.name),
                bytes: file.bytes().to_vec(),
                name: file.name,
            };
            let _ = tx.send(JobUpdate::Finished(Ok(output)));
        });
        self.job = Some(RunningJob {
            updates: rx,
            task,
            _ticker: None,
        });
        Ok(())
    }

    /// Abandons any running job, releases the result and clears the inputs.
    pub fn create_another(&mut self) {
        self.job = None;
        self.result.release();
        self.prompt.clear();
        self.video_file = None;
        self.progress.clear();
        self.transition(JobEvent::Reset);
    }

    pub fn download(&self) -> ToolboxResult<DownloadOutcome> {
        match &self.state {
            GenerationJobState::Ready(handle) => Ok(DownloadOutcome::File {
                location: handle.location.clone(),
                suggested_name: handle.name.clone(),
            }),
            _ => Err(ToolboxError::NoResult),
        }
    }

    pub fn render(&self) -> Value {
        let mut children: Vec<Value> = Vec::new();

        if let GenerationJobState::Ready(handle) = &self.state {
            let source = handle.location.to_string_lossy();
            children.push(node(UiText::new("Your Video is Ready!").size(18.0)));
            children.push(node(MediaPreview::new("video", &source).title(&handle.name)));
            children.push(node(UiButton::new("Download Video", "video_download").id("video_download")));
            children.push(node(UiButton::new("Create Another", "video_reset").id("video_reset")));
            return node(UiColumn::new(children).padding(16));
        }

        let busy = self.state.is_busy();
        match self.variant {
            VideoVariant::Generate => {
                children.push(node(UiText::new("What do you want to see?").size(16.0)));
                children.push(node(
                    TextInput::new("video_prompt")
                        .text(&self.prompt)
                        .hint("A cinematic drone shot of a neon city at night...")
                        .enabled(!busy),
                ));
                if !busy {
                    children.push(node(UiButton::new("Generate AI Video", "video_generate").id("video_generate")));
                }
                children.push(node(UiText::new("Powered by Veo 3.1 Preview").size(12.0)));
            }
            VideoVariant::Trim => {
                children.push(node(
                    UiButton::new("Upload video to trim", "video_select")
                        .requires_file_picker(true)
                        .accept("video/*"),
                ));
                if let Some(file) = &self.video_file {
                    let line = format!("{} · {}", file.name, file.size_label());
                    children.push(node(UiText::new(&line).content_description("video_file")));
                    if !busy {
                        children.push(node(UiButton::new("Trim Now", "video_trim").id("video_trim")));
                    }
                }
            }
        }

        if busy {
            let message = self.progress.current();
            let text = message.as_deref().unwrap_or("Creating Magic");
            children.push(node(UiProgress::new().text(text).content_description("video_progress")));
            if self.variant == VideoVariant::Generate {
                children.push(node(
                    UiText::new("Generating high-quality AI video usually takes 1-3 minutes.").size(12.0),
                ));
            }
        }

        if let GenerationJobState::Failed(reason) = &self.state {
            children.push(node(UiText::new(reason).content_description("video_error")));
        }

        node(UiColumn::new(children).padding(16))
    }
}
