use thiserror::Error;

/// Every failure a panel or the router can surface.
///
/// None of these are fatal to the toolbox: the router catches them at the
/// panel boundary and renders `user_message()` as an alert.
#[derive(Debug, Error)]
pub enum ToolboxError {
    /// No files were supplied to a file-driven workflow.
    #[error("no input files")]
    EmptyInput,

    /// A prompt-driven workflow got a blank prompt.
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("operation needs at least {required} files, got {found}")]
    InsufficientInput { required: usize, found: usize },

    #[error("file index {index} out of range (len {len})")]
    InvalidIndex { index: usize, len: usize },

    /// The panel already has a task in flight; the trigger is ignored.
    #[error("a task is already running")]
    Busy,

    #[error("no API credential selected")]
    CredentialMissing,

    #[error("API credential rejected: {0}")]
    CredentialInvalid(String),

    #[error("{service}: {message}")]
    ExternalService { service: String, message: String },

    /// Download requested before anything was produced.
    #[error("no result available")]
    NoResult,

    #[error("polling stopped after {0} attempts")]
    PollLimitReached(u32),

    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A known action arrived without a field it needs, or for the wrong panel.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Built through `From`, which strips the request URL.
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl From<reqwest::Error> for ToolboxError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.without_url())
    }
}

impl ToolboxError {
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// True for errors the user fixes by re-selecting an API key.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::CredentialMissing | Self::CredentialInvalid(_))
    }

    /// Text shown to the user in the panel alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Please select at least one file.".into(),
            Self::EmptyPrompt => "Please enter a prompt.".into(),
            Self::InsufficientInput { required, .. } => {
                format!("Please select at least {required} PDF files to merge.")
            }
            Self::InvalidIndex { .. } => "That file is no longer in the list.".into(),
            Self::Busy => "Still working on the previous request.".into(),
            Self::CredentialMissing | Self::CredentialInvalid(_) => {
                "API Key error. Please re-select your key.".into()
            }
            Self::NoResult => "Run the tool first.".into(),
            Self::PollLimitReached(_) => "Video generation failed. Please try again.".into(),
            Self::NotFound(_) => "Tool definition not found.".into(),
            Self::Network(_) => "Network error. Please check your connection and try again.".into(),
            other => other.to_string(),
        }
    }
}

pub type ToolboxResult<T> = Result<T, ToolboxError>;
