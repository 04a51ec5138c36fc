use thiserror::Error;

/// Call engine errors
#[derive(Error, Debug)]
pub enum CallEngineError {
    /// A required setting is missing or malformed. Raised before any dial attempt.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job metadata could not be parsed
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// The outbound leg could not be established
    #[error("Dial failed: {0}")]
    Dial(String),

    /// A speech or language-model attempt ran past its deadline
    #[error("Provider timed out after {0:?}")]
    ProviderTimeout(std::time::Duration),

    /// A speech or language-model attempt returned an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// The transfer capability failed or its preconditions were not met
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// The orchestrator tried to move a call between incompatible states
    #[error("Invalid call state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    /// The conversation session could not be started
    #[error("Session error: {0}")]
    Session(String),

    /// The telephony server rejected a request
    #[error("API error [{code}]: {message}")]
    Api {
        code: String,
        message: String,
    },

    /// Transport-level HTTP failure talking to the telephony server
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Access token could not be signed
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CallEngineError {
    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Dial error
    pub fn dial<S: Into<String>>(msg: S) -> Self {
        Self::Dial(msg.into())
    }

    /// Create a new Provider error
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new Transfer error
    pub fn transfer<S: Into<String>>(msg: S) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a new Session error
    pub fn session<S: Into<String>>(msg: S) -> Self {
        Self::Session(msg.into())
    }

    /// Create a new Api error
    pub fn api<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the server reported that the resource already exists
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Api { code, message } => {
                code == "already_exists" || message.to_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}

/// Result type for call engine operations
pub type Result<T> = std::result::Result<T, CallEngineError>;
