use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const VIDEO_PROGRESS_MESSAGES: [&str; 6] = [
    "Analyzing your creative vision...",
    "Synthesizing pixel-perfect frames...",
    "Injecting cinematic motion...",
    "Applying high-definition textures...",
    "Fine-tuning frame consistency...",
    "Finalizing your masterpiece...",
];

/// Latest status line of a running job, shared with whoever renders it.
#[derive(Debug, Clone, Default)]
pub struct ProgressFeed(Arc<Mutex<Option<String>>>);

impl ProgressFeed {
    pub fn current(&self) -> Option<String> {
        self.0.lock().ok().and_then(|m| m.clone())
    }

    pub fn set(&self, message: &str) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = Some(message.to_string());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = None;
        }
    }
}

/// Rotates through a fixed message list on a timer until stopped.
///
/// The first message appears one period after start. Stopping is idempotent
/// and also happens on drop.
pub struct ProgressTicker {
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(feed: ProgressFeed, messages: &'static [&'static str], every: Duration) -> Self {
        if messages.is_empty() || every.is_zero() {
            return Self { task: None };
        }
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            for message in messages.iter().cycle() {
                interval.tick().await;
                feed.set(message);
            }
        });
        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Returns `true` only for the call that actually stopped the timer.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
