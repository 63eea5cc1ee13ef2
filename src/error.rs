use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("planet {name} not found")]
    PlanetNotFound { name: String },

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<prometheus::Error> for DiscoverError {
    fn from(err: prometheus::Error) -> Self {
        DiscoverError::Metrics(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiscoverError>;

/// Failure category of a single pod attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Auth,
    Decode,
}

/// Why one pod attempt stopped
///
/// The `Display` text is what gets recorded on the pod's result, so it must
/// stay stable for consumers that match on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PodError {
    #[error("{0}")]
    Connect(String),

    #[error("Auth failed")]
    AuthSend,

    #[error("Bad password")]
    BadPassword,

    #[error("Cube req fail")]
    CubeRequest,

    #[error("Cube parse fail")]
    CubeParse,

    #[error("Planet req fail")]
    PlanetRequest,

    #[error("Planet parse fail")]
    PlanetParse,

    #[error("scan task aborted")]
    Aborted,
}

impl PodError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PodError::Connect(_)
            | PodError::CubeRequest
            | PodError::PlanetRequest
            | PodError::Aborted => FailureKind::Transport,
            PodError::AuthSend | PodError::BadPassword => FailureKind::Auth,
            PodError::CubeParse | PodError::PlanetParse => FailureKind::Decode,
        }
    }
}
