use crate::error::{ToolboxError, ToolboxResult};
use crate::genai::GenerativeService;
use crate::ui::{node, Button as UiButton, Column as UiColumn, Progress as UiProgress, Text as UiText, TextInput};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const GREETING: &str = "Hello! I'm the MultiTool Box AI Assistant. How can I help you today?";
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";
pub const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
}

impl ChatEntry {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Single-turn chat: every question is sent on its own, without history.
pub struct ChatPanel {
    service: Arc<dyn GenerativeService>,
    model: String,
    transcript: Vec<ChatEntry>,
    loading: bool,
}

impl ChatPanel {
    pub fn new(service: Arc<dyn GenerativeService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            transcript: Vec::new(),
            loading: false,
        }
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Appends the question and exactly one answer. Service failures become
    /// an apology in the transcript, never an error.
    pub async fn ask(&mut self, prompt: &str) -> ToolboxResult<&ChatEntry> {
        if prompt.trim().is_empty() {
            return Err(ToolboxError::EmptyPrompt);
        }
        if self.loading {
            return Err(ToolboxError::Busy);
        }
        self.transcript.push(ChatEntry::new(ChatRole::User, prompt));
        self.loading = true;
        info!("[chat] asking {} ({} chars)", self.model, prompt.chars().count());

        let reply = match self.service.generate_text(&self.model, prompt).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => EMPTY_REPLY.to_string(),
            Err(e) => {
                warn!("[chat] request failed: {e}");
                SERVICE_UNAVAILABLE.to_string()
            }
        };
        self.loading = false;
        self.transcript.push(ChatEntry::new(ChatRole::Assistant, reply));
        Ok(&self.transcript[self.transcript.len() - 1])
    }

    pub fn render(&self) -> Value {
        let mut children: Vec<Value> = Vec::new();
        if self.transcript.is_empty() {
            children.push(node(UiText::new(GREETING).content_description("chat_assistant")));
        }
        for entry in &self.transcript {
            let cd = match entry.role {
                ChatRole::User => "chat_user",
                ChatRole::Assistant => "chat_assistant",
            };
            children.push(node(UiText::new(&entry.text).content_description(cd)));
        }
        if self.loading {
            children.push(node(UiProgress::new().content_description("chat_loading")));
        }
        children.push(node(
            TextInput::new("chat_input")
                .hint("Type your question...")
                .single_line(true)
                .action_on_submit("chat_send")
                .enabled(!self.loading),
        ));
        children.push(node(UiButton::new("Send", "chat_send").id("chat_send")));
        node(UiColumn::new(children).padding(16).content_description("chat_panel"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedService, TextReply};
    use std::sync::atomic::Ordering;

    fn panel(service: &Arc<ScriptedService>) -> ChatPanel {
        ChatPanel::new(service.clone(), "gemini-3-flash-preview")
    }

    #[tokio::test]
    async fn answer_follows_question() {
        let service = Arc::new(ScriptedService::replying("hi there"));
        let mut chat = panel(&service);
        chat.ask("hello").await.unwrap();
        assert_eq!(
            chat.transcript(),
            &[
                ChatEntry::new(ChatRole::User, "hello"),
                ChatEntry::new(ChatRole::Assistant, "hi there"),
            ]
        );
        assert!(!chat.is_loading());
    }

    #[tokio::test]
    async fn empty_reply_gets_apology() {
        let service = Arc::new(ScriptedService::default());
        let mut chat = panel(&service);
        let answer = chat.ask("anything?").await.unwrap();
        assert_eq!(answer.text, EMPTY_REPLY);

        *service.text_reply.lock().unwrap() = TextReply::Text(String::new());
        let answer = chat.ask("again").await.unwrap();
        assert_eq!(answer.text, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn failure_becomes_unavailable_message() {
        let service = Arc::new(ScriptedService::default());
        *service.text_reply.lock().unwrap() = TextReply::Fail;
        let mut chat = panel(&service);
        let answer = chat.ask("hello").await.unwrap();
        assert_eq!(answer.role, ChatRole::Assistant);
        assert_eq!(answer.text, SERVICE_UNAVAILABLE);
        assert_eq!(chat.transcript().len(), 2);
    }

    #[tokio::test]
    async fn blank_prompt_leaves_transcript_alone() {
        let service = Arc::new(ScriptedService::replying("unused"));
        let mut chat = panel(&service);
        assert!(matches!(chat.ask(" \n ").await, Err(ToolboxError::EmptyPrompt)));
        assert!(chat.transcript().is_empty());
        assert_eq!(service.text_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn render_shows_greeting_then_transcript() {
        let service = Arc::new(ScriptedService::default());
        let mut chat = panel(&service);
        assert!(chat.render().to_string().contains("How can I help you today?"));

        chat.transcript.push(ChatEntry::new(ChatRole::User, "ping"));
        let ui = chat.render().to_string();
        assert!(ui.contains("ping"));
        assert!(!ui.contains("How can I help you today?"));
    }
}
