/// Clipsight error types
#[derive(Debug, thiserror::Error)]
pub enum ClipsightError {
    /// Analysis disabled or credentials missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider id without a registered adapter
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Non-success HTTP response from a provider
    #[error("{provider} API request failed: {status} {status_text}")]
    Http {
        provider: String,
        status: u16,
        status_text: String,
    },

    /// Provider answered without any extractable text
    #[error("Empty content in model response")]
    EmptyContent,

    /// No recovery strategy produced a valid value
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network/transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipsightError {
    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create unsupported provider error
    pub fn unsupported_provider<S: Into<String>>(provider: S) -> Self {
        Self::UnsupportedProvider(provider.into())
    }

    /// Create HTTP status error
    pub fn http<P: Into<String>, S: Into<String>>(provider: P, status: u16, status_text: S) -> Self {
        Self::Http {
            provider: provider.into(),
            status,
            status_text: status_text.into(),
        }
    }

    /// Create parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl ClipsightError {
    /// Get HTTP-like status code for surfacing to callers
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Config(_) => 412,
            Self::UnsupportedProvider(_) => 400,
            Self::Http { status, .. } => *status,
            Self::EmptyContent => 502,
            Self::Parse(_) => 502,
            Self::Network(_) => 503,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Other(_) => 500,
        }
    }
}
