//! Download/preview handles for produced output.
//!
//! A handle is created and revoked only through an [`ArtifactStore`]. Panels
//! own their handles through a [`HandleSlot`], which revokes whatever it holds
//! when replaced, released or dropped, and never revokes the same handle twice.

use crate::error::ToolboxResult;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHandle {
    pub id: Uuid,
    pub name: String,
    pub mime: String,
    pub location: PathBuf,
}

/// Why an operation produced no bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulatedKind {
    Excel,
    Generic,
}

/// Output of a workflow: either real bytes behind a handle, or a marker for
/// tools with nothing real behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Artifact {
    Real(ArtifactHandle),
    Simulated(SimulatedKind),
}

impl Artifact {
    pub fn handle(&self) -> Option<&ArtifactHandle> {
        match self {
            Artifact::Real(handle) => Some(handle),
            Artifact::Simulated(_) => None,
        }
    }
}

/// What the host does when the user presses "Download".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadOutcome {
    File {
        location: PathBuf,
        suggested_name: String,
    },
    Acknowledged {
        message: String,
    },
}

pub trait ArtifactStore: Send + Sync {
    fn create(&self, name: &str, mime: &str, bytes: &[u8]) -> ToolboxResult<ArtifactHandle>;
    fn revoke(&self, handle: &ArtifactHandle);
}

/// Writes each artifact as a file under one directory; revoking deletes it.
pub struct DirArtifactStore {
    root: PathBuf,
    // Keeps a temporary root alive for the store's lifetime.
    _temp: Option<tempfile::TempDir>,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> ToolboxResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, _temp: None })
    }

    /// A store rooted in a fresh temporary directory, removed on drop.
    pub fn temporary() -> ToolboxResult<Self> {
        let temp = tempfile::Builder::new().prefix("multitoolbox").tempdir()?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "artifact".into()
    } else {
        cleaned
    }
}

impl ArtifactStore for DirArtifactStore {
    fn create(&self, name: &str, mime: &str, bytes: &[u8]) -> ToolboxResult<ArtifactHandle> {
        let id = Uuid::new_v4();
        let location = self
            .root
            .join(format!("multitoolbox_{}_{}", id.simple(), sanitize_name(name)));
        fs::write(&location, bytes)?;
        log::debug!("[artifacts] created {} ({} bytes)", location.display(), bytes.len());
        Ok(ArtifactHandle {
            id,
            name: name.to_string(),
            mime: mime.to_string(),
            location,
        })
    }

    fn revoke(&self, handle: &ArtifactHandle) {
        if let Err(e) = fs::remove_file(&handle.location) {
            log::warn!("[artifacts] revoke {} failed: {e}", handle.location.display());
        }
    }
}

/// Holds at most one outstanding handle for its owner.
pub struct HandleSlot {
    store: Arc<dyn ArtifactStore>,
    current: Option<ArtifactHandle>,
}

impl HandleSlot {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn get(&self) -> Option<&ArtifactHandle> {
        self.current.as_ref()
    }

    /// Creates a handle for `bytes`, revoking the previous one first.
    pub fn issue(&mut self, name: &str, mime: &str, bytes: &[u8]) -> ToolboxResult<ArtifactHandle> {
        self.release();
        let handle = self.store.create(name, mime, bytes)?;
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Revokes the held handle, if any. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(handle) = self.current.take() {
            self.store.revoke(&handle);
        }
    }
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        self.release();
    }
}
