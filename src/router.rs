use crate::artifacts::{ArtifactStore, DirArtifactStore, DownloadOutcome};
use crate::catalog::{Catalog, CategoryFilter, ToolDescriptor};
use crate::config::ToolboxConfig;
use crate::dispatch::{self, CustomTool, DispatchResult, HandlerKind};
use crate::error::{ToolboxError, ToolboxResult};
use crate::features::chat::ChatPanel;
use crate::features::misc_panels::{
    render_custom, render_not_found, render_placeholder, render_scaffold, JsonFormatterState,
};
use crate::features::pdf::{PdfToolbox, ResizeOption, UploadedFile};
use crate::features::pdf_engine::{LopdfBackend, PdfBackend};
use crate::features::render_menu;
use crate::features::video::VideoToolbox;
use crate::genai::{ConfiguredCredentials, CredentialProvider, GeminiClient, GenerativeService};
use crate::state::{AppState, Screen};
use crate::ui::{node, Column as UiColumn, Text as UiText};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One file in a command: a host-side path, or the bytes inline as base64.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilePayload {
    pub name: Option<String>,
    pub path: Option<String>,
    pub data_base64: Option<String>,
}

impl FilePayload {
    fn into_upload(self) -> ToolboxResult<UploadedFile> {
        match (self.path, self.data_base64) {
            (_, Some(data)) => {
                UploadedFile::from_base64(self.name.unwrap_or_else(|| "upload".into()), &data)
            }
            (Some(path), None) => {
                let mut file = UploadedFile::from_path(Path::new(&path))?;
                if let Some(name) = self.name {
                    file.name = name;
                }
                Ok(file)
            }
            (None, None) => Err(ToolboxError::InvalidCommand(
                "file needs `path` or `data_base64`".into(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Command {
    pub action: String,
    /// Id of the widget that fired the action, when the host sends one.
    pub id: Option<String>,
    pub tool_id: Option<String>,
    pub query: Option<String>,
    pub category: Option<String>,
    pub prompt: Option<String>,
    pub index: Option<usize>,
    pub option: Option<String>,
    pub files: Option<Vec<FilePayload>>,
    pub bindings: Option<HashMap<String, String>>,
}

#[derive(Debug)]
enum Action {
    Init,
    /// Re-render, picking up progress of running jobs.
    Refresh,
    Reset,
    Back,
    Search { query: String },
    SelectCategory { filter: CategoryFilter },
    OpenTool { tool_id: String },
    SetApiKey { key: String },
    ChatSend { prompt: String },
    JsonFormat { input: String },
    PdfAddFiles { files: Vec<FilePayload> },
    PdfRemoveFile { index: usize },
    PdfResizeOption { option: ResizeOption },
    PdfRun,
    PdfDownload,
    PdfReset,
    VideoGenerate { prompt: String },
    VideoSelect { file: FilePayload },
    VideoTrim,
    VideoDownload,
    VideoReset,
}

fn missing(field: &str, action: &str) -> ToolboxError {
    ToolboxError::InvalidCommand(format!("{action} needs `{field}`"))
}

fn parse_action(command: Command) -> ToolboxResult<Action> {
    let Command {
        action,
        id,
        tool_id,
        query,
        category,
        prompt,
        index,
        option,
        files,
        bindings,
    } = command;

    let bindings = bindings.unwrap_or_default();
    let bound = |key: &str| bindings.get(key).cloned();

    match action.as_str() {
        "init" => Ok(Action::Init),
        "refresh" => Ok(Action::Refresh),
        "reset" => Ok(Action::Reset),
        "back" => Ok(Action::Back),
        "search" => Ok(Action::Search {
            query: query.or_else(|| bound("search")).unwrap_or_default(),
        }),
        "select_category" => {
            let raw = category.or(id).ok_or_else(|| missing("category", &action))?;
            let filter = CategoryFilter::parse(&raw)
                .ok_or_else(|| ToolboxError::InvalidCommand(format!("unknown category {raw}")))?;
            Ok(Action::SelectCategory { filter })
        }
        "open_tool" => Ok(Action::OpenTool {
            tool_id: tool_id.or(id).ok_or_else(|| missing("tool_id", &action))?,
        }),
        "set_api_key" => Ok(Action::SetApiKey {
            key: bound("api_key").ok_or_else(|| missing("api_key", &action))?,
        }),
        "chat_send" => Ok(Action::ChatSend {
            prompt: prompt.or_else(|| bound("chat_input")).unwrap_or_default(),
        }),
        "json_format" => Ok(Action::JsonFormat {
            input: bound("json_input").unwrap_or_default(),
        }),
        "pdf_add_files" => Ok(Action::PdfAddFiles {
            files: files.unwrap_or_default(),
        }),
        "pdf_remove_file" => {
            let index = index
                .or_else(|| {
                    id.as_deref()
                        .and_then(|id| id.strip_prefix("pdf_remove_"))
                        .and_then(|n| n.parse().ok())
                })
                .ok_or_else(|| missing("index", &action))?;
            Ok(Action::PdfRemoveFile { index })
        }
        "pdf_resize_option" => {
            let raw = option.or(id).ok_or_else(|| missing("option", &action))?;
            let option = ResizeOption::parse(&raw)
                .ok_or_else(|| ToolboxError::InvalidCommand(format!("unknown resize option {raw}")))?;
            Ok(Action::PdfResizeOption { option })
        }
        "pdf_run" => Ok(Action::PdfRun),
        "pdf_download" => Ok(Action::PdfDownload),
        "pdf_reset" => Ok(Action::PdfReset),
        "video_generate" => Ok(Action::VideoGenerate {
            prompt: prompt.or_else(|| bound("video_prompt")).unwrap_or_default(),
        }),
        "video_select" => {
            let file = files
                .and_then(|f| f.into_iter().next())
                .ok_or_else(|| missing("files", &action))?;
            Ok(Action::VideoSelect { file })
        }
        "video_trim" => Ok(Action::VideoTrim),
        "video_download" => Ok(Action::VideoDownload),
        "video_reset" => Ok(Action::VideoReset),
        other => Err(ToolboxError::UnknownAction(other.to_string())),
    }
}

/// External collaborators of the toolbox.
pub struct Services {
    pub generative: Arc<dyn GenerativeService>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Set when keys come from configuration, which enables `set_api_key`.
    pub key_store: Option<Arc<ConfiguredCredentials>>,
}

enum Panel<B: PdfBackend> {
    Chat(ChatPanel),
    Pdf(PdfToolbox<B>),
    Video(VideoToolbox),
    Custom {
        dispatch: DispatchResult,
        custom: CustomTool,
        json: JsonFormatterState,
    },
    Static(DispatchResult),
    Missing(String),
}

/// The shell: owns navigation state and the one open panel. Dropping or
/// replacing the panel releases every handle it issued.
pub struct Toolbox<B: PdfBackend = LopdfBackend> {
    state: AppState,
    catalog: Catalog,
    config: ToolboxConfig,
    services: Services,
    pdf_backend: Arc<B>,
    panel: Option<Panel<B>>,
}

impl Toolbox<LopdfBackend> {
    /// Production wiring: Gemini over HTTP, key from configuration, artifacts
    /// as files under `artifact_dir` (or a temporary directory).
    pub fn from_config(config: ToolboxConfig) -> ToolboxResult<Self> {
        config.validate()?;
        let artifacts: Arc<dyn ArtifactStore> = match &config.artifact_dir {
            Some(dir) => Arc::new(DirArtifactStore::new(dir)?),
            None => Arc::new(DirArtifactStore::temporary()?),
        };
        let key_store = Arc::new(ConfiguredCredentials::new(config.api_key.clone()));
        let client = GeminiClient::new(&config, key_store.clone())?;
        let services = Services {
            generative: Arc::new(client),
            credentials: key_store.clone(),
            artifacts,
            key_store: Some(key_store),
        };
        info!("[router] toolbox ready (api base {})", config.api_base_url);
        Ok(Self::new(config, Catalog::builtin(), services, Arc::new(LopdfBackend)))
    }
}

impl<B: PdfBackend> Toolbox<B> {
    pub fn new(config: ToolboxConfig, catalog: Catalog, services: Services, pdf_backend: Arc<B>) -> Self {
        Self {
            state: AppState::new(),
            catalog,
            config,
            services,
            pdf_backend,
            panel: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Applies one command and renders the resulting screen.
    ///
    /// Long jobs (PDF runs, video generation and trimming) only start here and
    /// keep running in the background; later commands, `refresh` included,
    /// render their progress and outcome. Malformed commands are errors; a
    /// rejected panel action is shown as an alert on the rendered screen.
    pub async fn handle_command(&mut self, command: Command) -> ToolboxResult<Value> {
        self.state.ensure_navigation();
        self.state.clear_notices();
        debug!("[router] action={}", command.action);
        let action = parse_action(command)?;
        self.sync_panel();
        if let Err(err) = self.apply(action).await {
            warn!("[router] action failed: {err}");
            self.state.last_alert = Some(err.user_message());
        }
        self.sync_panel();
        Ok(self.render())
    }

    fn sync_panel(&mut self) {
        match &mut self.panel {
            Some(Panel::Pdf(pdf)) => pdf.sync(),
            Some(Panel::Video(video)) => video.sync(),
            _ => {}
        }
    }

    /// JSON in, JSON out. Never fails: errors render as an error screen.
    pub async fn dispatch_json(&mut self, input: &str) -> String {
        let ui = match serde_json::from_str::<Command>(input) {
            Ok(command) => match self.handle_command(command).await {
                Ok(ui) => ui,
                Err(err) => error_ui(&err.to_string()),
            },
            Err(err) => error_ui(&format!("invalid_command:{err}")),
        };
        ui.to_string()
    }

    async fn apply(&mut self, action: Action) -> ToolboxResult<()> {
        match action {
            Action::Init | Action::Refresh => {}
            Action::Reset => {
                self.panel = None;
                self.state.reset();
            }
            Action::Back => {
                self.state.pop_screen();
                if self.state.current_screen() == Screen::Home {
                    self.panel = None;
                    self.state.current_tool_id = None;
                }
            }
            Action::Search { query } => {
                self.panel = None;
                self.state.set_search(&query);
            }
            Action::SelectCategory { filter } => {
                self.panel = None;
                self.state.set_category(filter);
            }
            Action::OpenTool { tool_id } => self.open_tool(&tool_id),
            Action::SetApiKey { key } => {
                let store = self.services.key_store.as_ref().ok_or_else(|| {
                    ToolboxError::InvalidCommand("API keys are managed by the host".into())
                })?;
                store.set_key(&key);
                info!("[router] API key updated");
            }
            Action::ChatSend { prompt } => {
                self.chat_panel()?.ask(&prompt).await?;
            }
            Action::JsonFormat { input } => match &mut self.panel {
                Some(Panel::Custom { json, .. }) => json.apply(&input),
                _ => return Err(no_panel("JSON formatter")),
            },
            Action::PdfAddFiles { files } => {
                let uploads = files
                    .into_iter()
                    .map(FilePayload::into_upload)
                    .collect::<ToolboxResult<Vec<_>>>()?;
                self.pdf_panel()?.add_files(uploads)?;
            }
            Action::PdfRemoveFile { index } => {
                self.pdf_panel()?.remove_file(index)?;
            }
            Action::PdfResizeOption { option } => self.pdf_panel()?.set_resize_option(option),
            Action::PdfRun => self.pdf_panel()?.start()?,
            Action::PdfDownload => {
                let outcome = self.pdf_panel()?.download()?;
                self.record_download(outcome);
            }
            Action::PdfReset => self.pdf_panel()?.reset(),
            Action::VideoGenerate { prompt } => self.video_panel()?.generate(&prompt)?,
            Action::VideoSelect { file } => {
                let upload = file.into_upload()?;
                self.video_panel()?.select_video(upload);
            }
            Action::VideoTrim => self.video_panel()?.trim()?,
            Action::VideoDownload => {
                let outcome = self.video_panel()?.download()?;
                self.record_download(outcome);
            }
            Action::VideoReset => self.video_panel()?.create_another(),
        }
        Ok(())
    }

    fn record_download(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Acknowledged { message } => self.state.last_alert = Some(message),
            file => self.state.last_download = Some(file),
        }
    }

    fn open_tool(&mut self, tool_id: &str) {
        // Release the old panel's handles before building the new one.
        self.panel = None;
        self.state.open_tool(tool_id);
        let panel = match dispatch::resolve(tool_id, &self.catalog) {
            Ok(result) => self.build_panel(result),
            Err(err) => {
                warn!("[router] {err}");
                Panel::Missing(tool_id.to_string())
            }
        };
        self.panel = Some(panel);
    }

    fn build_panel(&self, result: DispatchResult) -> Panel<B> {
        let handler = result.handler;
        match handler {
            HandlerKind::Custom(CustomTool::AiChat) => Panel::Chat(ChatPanel::new(
                self.services.generative.clone(),
                self.config.chat_model.clone(),
            )),
            HandlerKind::Custom(custom) => Panel::Custom {
                dispatch: result,
                custom,
                json: JsonFormatterState::default(),
            },
            HandlerKind::Video(variant) => Panel::Video(VideoToolbox::new(
                result.tool,
                variant,
                self.services.generative.clone(),
                self.services.credentials.clone(),
                self.services.artifacts.clone(),
                &self.config,
            )),
            HandlerKind::Pdf(operation) => Panel::Pdf(PdfToolbox::new(
                result.tool,
                operation,
                self.pdf_backend.clone(),
                self.services.artifacts.clone(),
                &self.config,
            )),
            HandlerKind::Scaffold(_) | HandlerKind::Placeholder => Panel::Static(result),
        }
    }

    fn chat_panel(&mut self) -> ToolboxResult<&mut ChatPanel> {
        match &mut self.panel {
            Some(Panel::Chat(chat)) => Ok(chat),
            _ => Err(no_panel("chat")),
        }
    }

    fn pdf_panel(&mut self) -> ToolboxResult<&mut PdfToolbox<B>> {
        match &mut self.panel {
            Some(Panel::Pdf(pdf)) => Ok(pdf),
            _ => Err(no_panel("PDF")),
        }
    }

    fn video_panel(&mut self) -> ToolboxResult<&mut VideoToolbox> {
        match &mut self.panel {
            Some(Panel::Video(video)) => Ok(video),
            _ => Err(no_panel("video")),
        }
    }

    pub fn render(&self) -> Value {
        let mut children: Vec<Value> = Vec::new();
        if let Some(alert) = &self.state.last_alert {
            children.push(node(UiText::new(alert).content_description("alert")));
        }
        if let Some(DownloadOutcome::File {
            location,
            suggested_name,
        }) = &self.state.last_download
        {
            children.push(json!({
                "type": "Download",
                "location": location,
                "suggested_name": suggested_name,
            }));
        }

        match self.state.current_screen() {
            Screen::Home => children.push(render_menu(&self.state, &self.catalog)),
            Screen::Tool => {
                children.extend(self.render_tool());
                maybe_push_back(&mut children, &self.state);
            }
        }
        node(UiColumn::new(children))
    }

    fn render_tool(&self) -> Vec<Value> {
        let Some(panel) = &self.panel else {
            return vec![render_not_found(self.state.current_tool_id.as_deref().unwrap_or_default())];
        };
        match panel {
            Panel::Chat(chat) => {
                let header = self.catalog.find("ai-chat").map(tool_header);
                header.into_iter().chain([chat.render()]).collect()
            }
            Panel::Pdf(pdf) => vec![tool_header(pdf.tool()), pdf.render()],
            Panel::Video(video) => {
                let header = self
                    .state
                    .current_tool_id
                    .as_deref()
                    .and_then(|id| self.catalog.find(id))
                    .map(tool_header);
                header.into_iter().chain([video.render()]).collect()
            }
            Panel::Custom {
                dispatch,
                custom,
                json,
            } => vec![tool_header(&dispatch.tool), render_custom(&dispatch.tool, *custom, json)],
            Panel::Static(result) => {
                let body = match result.handler {
                    HandlerKind::Scaffold(kind) => render_scaffold(&result.tool, kind),
                    _ => render_placeholder(&result.tool),
                };
                vec![tool_header(&result.tool), body]
            }
            Panel::Missing(id) => vec![render_not_found(id)],
        }
    }
}

fn no_panel(which: &str) -> ToolboxError {
    ToolboxError::InvalidCommand(format!("no {which} panel is open"))
}

fn tool_header(tool: &ToolDescriptor) -> Value {
    let title = format!("{} {}", tool.icon, tool.name);
    node(UiColumn::new(vec![
        node(UiText::new(&title).size(20.0)),
        node(UiText::new(&tool.description).size(13.0)),
        node(UiText::new(tool.category.label()).size(11.0).content_description("tool_category")),
    ]))
}

fn maybe_push_back(children: &mut Vec<Value>, state: &AppState) {
    if state.nav_depth() > 1 {
        children.push(json!({
            "type": "Button",
            "text": "Back",
            "action": "back"
        }));
    }
}

fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::progress::VIDEO_PROGRESS_MESSAGES;
    use crate::features::video::GENERATION_FAILED;
    use crate::testing::{pdf_with_pages, RecordingStore, ScriptedCredentials, ScriptedService};
    use base64::Engine;
    use std::time::Duration;

    struct Harness {
        toolbox: Toolbox,
        service: Arc<ScriptedService>,
        store: Arc<RecordingStore>,
    }

    fn harness(service: ScriptedService) -> Harness {
        let service = Arc::new(service);
        let store = Arc::new(RecordingStore::default());
        let services = Services {
            generative: service.clone(),
            credentials: Arc::new(ScriptedCredentials::with_key()),
            artifacts: store.clone(),
            key_store: None,
        };
        let toolbox = Toolbox::new(
            ToolboxConfig::default(),
            Catalog::builtin(),
            services,
            Arc::new(LopdfBackend),
        );
        Harness {
            toolbox,
            service,
            store,
        }
    }

    fn make_command(action: &str) -> Command {
        Command {
            action: action.into(),
            ..Command::default()
        }
    }

    fn open(tool_id: &str) -> Command {
        Command {
            tool_id: Some(tool_id.into()),
            ..make_command("open_tool")
        }
    }

    fn extract_texts(ui: &Value) -> Vec<String> {
        fn walk(node: &Value, acc: &mut Vec<String>) {
            if let Some(text) = node.get("text").and_then(|t| t.as_str()) {
                acc.push(text.to_string());
            }
            if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    walk(child, acc);
                }
            }
        }

        let mut out = Vec::new();
        walk(ui, &mut out);
        out
    }

    fn assert_contains_text(ui: &Value, needle: &str) {
        let texts = extract_texts(ui);
        assert!(
            texts.iter().any(|t| t.contains(needle)),
            "expected UI to contain text with `{needle}`, found: {texts:?}"
        );
    }

    fn shows_progress(ui: &Value) -> bool {
        ui.to_string().contains(r#""type":"Progress""#)
    }

    /// Refreshes until no job is in flight, on the real clock.
    async fn refresh_until_idle(toolbox: &mut Toolbox) -> Value {
        for _ in 0..500 {
            let ui = toolbox.handle_command(make_command("refresh")).await.unwrap();
            if !shows_progress(&ui) {
                return ui;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not finish");
    }

    fn texts_with_cd(ui: &Value, cd: &str) -> Vec<String> {
        fn walk(node: &Value, cd: &str, acc: &mut Vec<String>) {
            if node.get("content_description").and_then(|c| c.as_str()) == Some(cd) {
                if let Some(text) = node.get("text").and_then(|t| t.as_str()) {
                    acc.push(text.to_string());
                }
            }
            if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    walk(child, cd, acc);
                }
            }
        }
        let mut out = Vec::new();
        walk(ui, cd, &mut out);
        out
    }

    #[tokio::test]
    async fn chat_round_trip_through_the_router() {
        let mut h = harness(ScriptedService::replying("hi there"));
        h.toolbox.handle_command(open("ai-chat")).await.unwrap();
        let mut send = make_command("chat_send");
        send.bindings = Some(HashMap::from([("chat_input".to_string(), "hello".to_string())]));
        let ui = h.toolbox.handle_command(send).await.unwrap();

        assert_eq!(texts_with_cd(&ui, "chat_user"), vec!["hello"]);
        assert_eq!(texts_with_cd(&ui, "chat_assistant"), vec!["hi there"]);
    }

    #[tokio::test]
    async fn pdf_merge_end_to_end_from_json() {
        let mut h = harness(ScriptedService::default());
        h.toolbox
            .dispatch_json(r#"{"action":"open_tool","tool_id":"pdf-merge"}"#)
            .await;

        let engine = base64::engine::general_purpose::STANDARD;
        let add = json!({
            "action": "pdf_add_files",
            "files": [
                { "name": "a.pdf", "data_base64": engine.encode(pdf_with_pages(&[(200, 200)])) },
                { "name": "b.pdf", "data_base64": engine.encode(pdf_with_pages(&[(300, 300)])) },
            ]
        });
        let ui: Value = serde_json::from_str(&h.toolbox.dispatch_json(&add.to_string()).await).unwrap();
        assert_contains_text(&ui, "a.pdf");
        assert_contains_text(&ui, "Run Merge PDF");

        let ui: Value =
            serde_json::from_str(&h.toolbox.dispatch_json(r#"{"action":"pdf_run"}"#).await).unwrap();
        assert!(shows_progress(&ui));
        let ui = refresh_until_idle(&mut h.toolbox).await;
        assert_contains_text(&ui, "Ready to Download");
        assert_eq!(h.store.created(), 1);

        let ui = h.toolbox.handle_command(make_command("pdf_download")).await.unwrap();
        let download = ui["children"]
            .as_array()
            .and_then(|c| c.iter().find(|n| n["type"] == "Download"))
            .cloned()
            .expect("download node");
        assert_eq!(download["suggested_name"], "pdf-merge-result.pdf");

        let Some(DownloadOutcome::File { location, .. }) = &h.toolbox.state().last_download else {
            panic!("expected a file download");
        };
        let bytes = h.store.bytes_at(location).unwrap();
        let backend = LopdfBackend;
        assert_eq!(backend.page_count(&backend.load(&bytes).unwrap()), 2);
    }

    #[tokio::test]
    async fn merge_with_one_file_alerts_without_handle() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("pdf-merge")).await.unwrap();
        let mut add = make_command("pdf_add_files");
        add.files = Some(vec![FilePayload {
            name: Some("only.pdf".into()),
            data_base64: Some(base64::engine::general_purpose::STANDARD.encode(pdf_with_pages(&[(10, 10)]))),
            ..FilePayload::default()
        }]);
        h.toolbox.handle_command(add).await.unwrap();
        let ui = h.toolbox.handle_command(make_command("pdf_run")).await.unwrap();
        assert_eq!(
            texts_with_cd(&ui, "alert"),
            vec!["Please select at least 2 PDF files to merge."]
        );
        assert_eq!(h.store.created(), 0);
    }

    #[tokio::test]
    async fn unknown_tool_renders_not_found() {
        let mut h = harness(ScriptedService::default());
        let ui = h.toolbox.handle_command(open("does-not-exist")).await.unwrap();
        assert_contains_text(&ui, "Tool definition not found.");
    }

    #[tokio::test]
    async fn placeholder_and_scaffold_panels_render() {
        let mut h = harness(ScriptedService::default());
        let ui = h.toolbox.handle_command(open("bmi-check")).await.unwrap();
        assert_contains_text(&ui, "BMI Checker logic loaded...");

        let ui = h.toolbox.handle_command(open("pdf-unlock")).await.unwrap();
        assert_contains_text(&ui, "Click or drag PDF to start");
        assert_eq!(h.toolbox.state().nav_depth(), 2);
    }

    #[tokio::test]
    async fn malformed_commands_are_errors() {
        let mut h = harness(ScriptedService::default());
        assert!(matches!(
            h.toolbox.handle_command(make_command("launch_rockets")).await,
            Err(ToolboxError::UnknownAction(_))
        ));
        assert!(matches!(
            h.toolbox.handle_command(make_command("open_tool")).await,
            Err(ToolboxError::InvalidCommand(_))
        ));
        let out = h.toolbox.dispatch_json("{not json").await;
        assert!(out.contains("invalid_command"));
    }

    #[tokio::test]
    async fn actions_for_a_closed_panel_only_alert() {
        let mut h = harness(ScriptedService::default());
        let ui = h.toolbox.handle_command(make_command("pdf_run")).await.unwrap();
        assert_eq!(texts_with_cd(&ui, "alert").len(), 1);
        assert_eq!(h.toolbox.state().current_screen(), Screen::Home);
    }

    #[tokio::test]
    async fn leaving_a_tool_releases_its_handles() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("pdf-reader")).await.unwrap();
        let mut add = make_command("pdf_add_files");
        add.files = Some(vec![FilePayload {
            name: Some("doc.pdf".into()),
            data_base64: Some(base64::engine::general_purpose::STANDARD.encode(pdf_with_pages(&[(10, 10)]))),
            ..FilePayload::default()
        }]);
        let ui = h.toolbox.handle_command(add).await.unwrap();
        assert!(ui.to_string().contains("MediaPreview"));
        assert_eq!(h.store.outstanding(), 1);

        h.toolbox.handle_command(make_command("back")).await.unwrap();
        assert_eq!(h.store.outstanding(), 0);
        assert_eq!(h.store.revoked(), 1);
        assert_eq!(h.toolbox.state().current_screen(), Screen::Home);
    }

    #[tokio::test]
    async fn search_and_category_filter_the_menu() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("ai-chat")).await.unwrap();
        let mut search = make_command("search");
        search.query = Some("excel".into());
        let ui = h.toolbox.handle_command(search).await.unwrap();
        assert_contains_text(&ui, "PDF to Excel");
        assert_eq!(h.toolbox.state().current_screen(), Screen::Home);

        let mut category = make_command("select_category");
        category.id = Some("Video Tools".into());
        h.toolbox.handle_command(category).await.unwrap();
        assert_eq!(h.toolbox.state().search_query, "excel");

        let ui = h.toolbox.handle_command(make_command("reset")).await.unwrap();
        assert_eq!(h.toolbox.state().active_category, CategoryFilter::All);
        assert_contains_text(&ui, "Merge PDF");
    }

    #[tokio::test(start_paused = true)]
    async fn excel_download_is_acknowledged() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("pdf-to-excel")).await.unwrap();
        let mut add = make_command("pdf_add_files");
        add.files = Some(vec![FilePayload {
            name: Some("t.pdf".into()),
            data_base64: Some("JVBERg==".into()),
            ..FilePayload::default()
        }]);
        h.toolbox.handle_command(add).await.unwrap();
        h.toolbox.handle_command(make_command("pdf_run")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_600)).await;
        let ui = h.toolbox.handle_command(make_command("pdf_download")).await.unwrap();
        assert_eq!(
            texts_with_cd(&ui, "alert"),
            vec!["Success! Your Excel file has been generated (Mock Demo)."]
        );
        assert!(h.toolbox.state().last_download.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn video_generation_through_the_router() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("video-gen")).await.unwrap();
        let mut generate = make_command("video_generate");
        generate.prompt = Some("   ".into());
        let ui = h.toolbox.handle_command(generate).await.unwrap();
        assert_eq!(texts_with_cd(&ui, "alert"), vec!["Please enter a prompt."]);
        assert_eq!(h.service.submits(), 0);

        let mut generate = make_command("video_generate");
        generate.bindings = Some(HashMap::from([("video_prompt".to_string(), "waves".to_string())]));
        let ui = h.toolbox.handle_command(generate).await.unwrap();
        assert_contains_text(&ui, "usually takes 1-3 minutes");

        tokio::time::sleep(Duration::from_secs(11)).await;
        let ui = h.toolbox.handle_command(make_command("refresh")).await.unwrap();
        assert_contains_text(&ui, "Your Video is Ready!");
        assert_eq!(h.store.outstanding(), 1);

        h.toolbox.handle_command(make_command("video_reset")).await.unwrap();
        assert_eq!(h.store.outstanding(), 0);
    }

    #[tokio::test]
    async fn json_formatter_formats_bound_input() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("json-format")).await.unwrap();
        let mut format = make_command("json_format");
        format.bindings = Some(HashMap::from([("json_input".to_string(), "{\"a\":1}".to_string())]));
        let ui = h.toolbox.handle_command(format).await.unwrap();
        assert_eq!(texts_with_cd(&ui, "json_output"), vec!["{\n  \"a\": 1\n}"]);
    }

    #[tokio::test]
    async fn api_key_is_settable_with_configured_credentials() {
        let store = Arc::new(RecordingStore::default());
        let key_store = Arc::new(ConfiguredCredentials::new(None));
        let services = Services {
            generative: Arc::new(ScriptedService::default()),
            credentials: key_store.clone(),
            artifacts: store,
            key_store: Some(key_store.clone()),
        };
        let mut toolbox = Toolbox::new(
            ToolboxConfig::default(),
            Catalog::builtin(),
            services,
            Arc::new(LopdfBackend),
        );
        let mut set = make_command("set_api_key");
        set.bindings = Some(HashMap::from([("api_key".to_string(), "secret".to_string())]));
        toolbox.handle_command(set).await.unwrap();
        assert_eq!(key_store.current_key().as_deref(), Some("secret"));
    }

    fn generate_command(prompt: &str) -> Command {
        Command {
            prompt: Some(prompt.into()),
            ..make_command("video_generate")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shell_stays_responsive_while_a_video_job_runs() {
        let mut h = harness(ScriptedService {
            done_after: None,
            ..ScriptedService::default()
        });
        h.toolbox.handle_command(open("video-gen")).await.unwrap();

        let started = tokio::time::Instant::now();
        h.toolbox.handle_command(generate_command("neon city")).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(4_100)).await;
        let ui = h.toolbox.handle_command(make_command("refresh")).await.unwrap();
        assert!(ui.to_string().contains(VIDEO_PROGRESS_MESSAGES[0]));

        tokio::time::sleep(Duration::from_secs(4)).await;
        let ui = h.toolbox.handle_command(make_command("refresh")).await.unwrap();
        assert!(ui.to_string().contains(VIDEO_PROGRESS_MESSAGES[1]));
        assert!(h.service.polls() >= 1);

        // Searching leaves the tool, which abandons the job.
        let mut search = make_command("search");
        search.query = Some("pdf".into());
        let ui = h.toolbox.handle_command(search).await.unwrap();
        assert_contains_text(&ui, "Merge PDF");
        let polls = h.service.polls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.service.polls(), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn impatient_host_can_retry_after_create_another() {
        let mut h = harness(ScriptedService {
            done_after: None,
            ..ScriptedService::default()
        });
        h.toolbox.handle_command(open("video-gen")).await.unwrap();

        let first = tokio::time::timeout(
            Duration::from_secs(60),
            h.toolbox.handle_command(generate_command("one")),
        )
        .await;
        assert!(matches!(first, Ok(Ok(_))));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.service.submits(), 1);

        let ui = h.toolbox.handle_command(generate_command("two")).await.unwrap();
        assert_eq!(texts_with_cd(&ui, "alert"), vec!["Still working on the previous request."]);

        h.toolbox.handle_command(make_command("video_reset")).await.unwrap();
        let ui = h.toolbox.handle_command(generate_command("two")).await.unwrap();
        assert!(texts_with_cd(&ui, "alert").is_empty());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.service.submits(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pdf_run_guards_reentry_and_drops_results_after_reset() {
        let mut h = harness(ScriptedService::default());
        h.toolbox.handle_command(open("pdf-to-excel")).await.unwrap();
        let mut add = make_command("pdf_add_files");
        add.files = Some(vec![FilePayload {
            name: Some("t.pdf".into()),
            data_base64: Some("JVBERg==".into()),
            ..FilePayload::default()
        }]);
        h.toolbox.handle_command(add).await.unwrap();

        let ui = h.toolbox.handle_command(make_command("pdf_run")).await.unwrap();
        assert_contains_text(&ui, "Processing...");
        let ui = h.toolbox.handle_command(make_command("pdf_run")).await.unwrap();
        assert_eq!(texts_with_cd(&ui, "alert"), vec!["Still working on the previous request."]);

        h.toolbox.handle_command(make_command("pdf_reset")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        let ui = h.toolbox.handle_command(make_command("refresh")).await.unwrap();
        assert!(!ui.to_string().contains("Ready to Download"));
        assert_contains_text(&ui, "Click or drag PDF to start");
    }

    #[tokio::test]
    async fn failed_requests_never_show_the_api_key() {
        let config = ToolboxConfig {
            api_base_url: "http://127.0.0.1:1/v1beta".into(),
            api_key: Some("SECRET_KEY_123".into()),
            ..ToolboxConfig::default()
        };
        let mut toolbox = Toolbox::from_config(config).unwrap();

        toolbox.handle_command(open("video-gen")).await.unwrap();
        toolbox.handle_command(generate_command("waves")).await.unwrap();
        let ui = refresh_until_idle(&mut toolbox).await;
        assert_eq!(texts_with_cd(&ui, "video_error"), vec![GENERATION_FAILED]);
        assert!(!ui.to_string().contains("SECRET_KEY_123"));

        toolbox.handle_command(open("ai-chat")).await.unwrap();
        let mut send = make_command("chat_send");
        send.prompt = Some("hello".into());
        let ui = toolbox.handle_command(send).await.unwrap();
        assert_eq!(
            texts_with_cd(&ui, "chat_assistant"),
            vec!["Service temporarily unavailable. Please try again later."]
        );
        assert!(!ui.to_string().contains("SECRET_KEY_123"));
    }
}
