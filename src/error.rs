use thiserror::Error;

#[derive(Error, Debug)]
pub enum AurionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("unexpected response shape: {marker} not found ({context})")]
    ProtocolShape { marker: String, context: String },

    #[error("login failed after {attempts} attempts: {source}")]
    LoginFailed {
        attempts: u32,
        #[source]
        source: Box<AurionError>,
    },

    #[error("request failed after {attempts} attempts: {source}")]
    RequestFailed {
        attempts: u32,
        #[source]
        source: Box<AurionError>,
    },

    #[error("session is not logged in")]
    NotLoggedIn,

    #[error("base payload field missing: {0}")]
    MissingField(String),

    #[error("invalid proxy URL {url}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("catalog not found: {0}")]
    CatalogNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AurionError {
    /// Failures worth another attempt: network trouble and rejected logins.
    /// Shape errors mean the server changed and a retry would not help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Authentication(_))
    }

    pub(crate) fn shape(marker: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ProtocolShape {
            marker: marker.into(),
            context: context.into(),
        }
    }
}

impl From<reqwest::Error> for AurionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
