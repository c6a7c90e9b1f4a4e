//! Test doubles shared by the unit tests of several modules.

use crate::artifacts::{ArtifactHandle, ArtifactStore};
use crate::error::{ToolboxError, ToolboxResult};
use crate::genai::{CredentialProvider, GenerativeService, VideoOperation, VideoRequest};
use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory store counting every create and revoke.
#[derive(Default)]
pub struct RecordingStore {
    live: Mutex<HashMap<Uuid, Vec<u8>>>,
    created: AtomicU32,
    revoked: Mutex<Vec<Uuid>>,
}

impl RecordingStore {
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> u32 {
        self.revoked.lock().unwrap().len() as u32
    }

    pub fn revoked_ids(&self) -> Vec<Uuid> {
        self.revoked.lock().unwrap().clone()
    }

    pub fn outstanding(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn bytes(&self, handle: &ArtifactHandle) -> Option<Vec<u8>> {
        self.live.lock().unwrap().get(&handle.id).cloned()
    }

    /// Lookup by the `location` a handle was given, as a host would see it.
    pub fn bytes_at(&self, location: &Path) -> Option<Vec<u8>> {
        let id = location.to_str()?.strip_prefix("mem/")?;
        let id = Uuid::parse_str(id).ok()?;
        self.live.lock().unwrap().get(&id).cloned()
    }
}

impl ArtifactStore for RecordingStore {
    fn create(&self, name: &str, mime: &str, bytes: &[u8]) -> ToolboxResult<ArtifactHandle> {
        let id = Uuid::new_v4();
        self.live.lock().unwrap().insert(id, bytes.to_vec());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(ArtifactHandle {
            id,
            name: name.to_string(),
            mime: mime.to_string(),
            location: PathBuf::from(format!("mem/{id}")),
        })
    }

    fn revoke(&self, handle: &ArtifactHandle) {
        let removed = self.live.lock().unwrap().remove(&handle.id);
        assert!(removed.is_some(), "handle {} revoked twice", handle.id);
        self.revoked.lock().unwrap().push(handle.id);
    }
}

pub enum TextReply {
    Text(String),
    Empty,
    Fail,
}

/// Scripted generative service. Video jobs finish after `done_after` polls,
/// or never when it is `None`.
pub struct ScriptedService {
    pub text_reply: Mutex<TextReply>,
    pub done_after: Option<u32>,
    pub video_uri: Option<String>,
    pub video_bytes: Vec<u8>,
    pub submit_failure: Mutex<Option<ToolboxError>>,
    /// Makes the job task die mid-poll without reporting back.
    pub panic_on_poll: AtomicBool,
    pub text_calls: AtomicU32,
    pub submits: AtomicU32,
    pub polls: AtomicU32,
    pub fetches: AtomicU32,
    pub last_request: Mutex<Option<VideoRequest>>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            text_reply: Mutex::new(TextReply::Empty),
            done_after: Some(1),
            video_uri: Some("https://files.example/video?alt=media".into()),
            video_bytes: b"MP4DATA".to_vec(),
            submit_failure: Mutex::new(None),
            panic_on_poll: AtomicBool::new(false),
            text_calls: AtomicU32::new(0),
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }
}

impl ScriptedService {
    pub fn replying(text: &str) -> Self {
        Self {
            text_reply: Mutex::new(TextReply::Text(text.into())),
            ..Self::default()
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeService for ScriptedService {
    async fn generate_text(&self, _model: &str, _prompt: &str) -> ToolboxResult<Option<String>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.text_reply.lock().unwrap() {
            TextReply::Text(text) => Ok(Some(text.clone())),
            TextReply::Empty => Ok(None),
            TextReply::Fail => Err(ToolboxError::service("gemini", "unavailable")),
        }
    }

    async fn generate_videos(&self, request: &VideoRequest) -> ToolboxResult<VideoOperation> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(err) = self.submit_failure.lock().unwrap().take() {
            return Err(err);
        }
        Ok(VideoOperation {
            name: "operations/test".into(),
            ..VideoOperation::default()
        })
    }

    async fn poll_video_operation(&self, operation: &VideoOperation) -> ToolboxResult<VideoOperation> {
        if self.panic_on_poll.load(Ordering::SeqCst) {
            panic!("scripted poll failure");
        }
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let done = self.done_after.is_some_and(|n| polls >= n);
        Ok(VideoOperation {
            name: operation.name.clone(),
            done,
            video_uri: if done { self.video_uri.clone() } else { None },
            error: None,
        })
    }

    async fn fetch_artifact(&self, _uri: &str) -> ToolboxResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.video_bytes.clone())
    }
}

/// Credential picker that grants a key when opened.
pub struct ScriptedCredentials {
    pub has_key: AtomicBool,
    pub grants_on_select: bool,
    pub select_calls: AtomicU32,
}

impl ScriptedCredentials {
    pub fn with_key() -> Self {
        Self {
            has_key: AtomicBool::new(true),
            grants_on_select: true,
            select_calls: AtomicU32::new(0),
        }
    }

    pub fn without_key() -> Self {
        Self {
            has_key: AtomicBool::new(false),
            grants_on_select: true,
            select_calls: AtomicU32::new(0),
        }
    }

    pub fn select_calls(&self) -> u32 {
        self.select_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for ScriptedCredentials {
    async fn has_selected_key(&self) -> bool {
        self.has_key.load(Ordering::SeqCst)
    }

    async fn open_select_key(&self) -> ToolboxResult<()> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if self.grants_on_select {
            self.has_key.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(ToolboxError::CredentialMissing)
        }
    }
}

/// A PDF with one page per entry in `sizes` (width, height in points).
pub fn pdf_with_pages(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for (w, h) in sizes {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), (*w).into(), (*h).into()],
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Two pages that inherit their MediaBox from the page tree root.
pub fn pdf_with_inherited_box(width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..2 {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
