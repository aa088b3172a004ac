use thiserror::Error;

pub type RecoResult<T> = Result<T, RecoError>;

#[derive(Debug, Error)]
pub enum RecoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// AEAD tag mismatch or passphrase unwrap failure. Deliberately carries no
    /// detail about which of the two happened.
    #[error("authentication failed: wrong key or corrupted data")]
    Authentication,

    #[error("require login")]
    RequireLogin,

    #[error("cloud storage is not configured")]
    CloudNotConfigured,

    #[error("invalid cloud settings: {0}")]
    InvalidCloudSettings(String),

    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Stable, transport-facing name of an error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    AlreadyExists,
    NotFound,
    Authentication,
    RequireLogin,
    CloudNotConfigured,
    InvalidCloudSettings,
    DataIntegrity,
    Transport,
    Config,
    Io,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Authentication => "authentication",
            ErrorKind::RequireLogin => "require_login",
            ErrorKind::CloudNotConfigured => "cloud_not_configured",
            ErrorKind::InvalidCloudSettings => "invalid_cloud_settings",
            ErrorKind::DataIntegrity => "data_integrity",
            ErrorKind::Transport => "transport",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RecoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecoError::InvalidInput(_) => ErrorKind::InvalidInput,
            RecoError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RecoError::NotFound(_) => ErrorKind::NotFound,
            RecoError::Authentication => ErrorKind::Authentication,
            RecoError::RequireLogin => ErrorKind::RequireLogin,
            RecoError::CloudNotConfigured => ErrorKind::CloudNotConfigured,
            RecoError::InvalidCloudSettings(_) => ErrorKind::InvalidCloudSettings,
            RecoError::DataIntegrity(_) => ErrorKind::DataIntegrity,
            RecoError::Transport(_) => ErrorKind::Transport,
            RecoError::Config(_) => ErrorKind::Config,
            RecoError::Io(_) => ErrorKind::Io,
            RecoError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Cloud/network failures are the only class a caller may retry blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecoError::Transport(_))
    }
}
