use thiserror::Error;

/// Every failure the tools can run into. The binaries print the message and
/// exit non-zero, so variants that need user action carry the remedy.
#[derive(Error, Debug)]
pub enum GitHubToolsError {
    #[error("GitHub API error: {0}")]
    ApiError(String),

    #[error("Octocrab error: {0}")]
    OctocrabError(#[from] octocrab::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid repository format: {0}")]
    InvalidRepository(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Repository has no tags")]
    NoTags,

    // Local checkout does not match the forge.
    #[error("Please check out the branch {expected} first (currently on {actual})")]
    WrongBranch { expected: String, actual: String },

    #[error("Please sync with the remote repository. The current online commit is {expected}")]
    OutOfSync { expected: String, actual: String },

    #[error("git failed: {0}")]
    GitError(String),

    #[error("Issue cache error: {0}")]
    CacheError(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Chart rendering error: {0}")]
    PlotError(String),

    #[error("Cannot open {target}: {reason}")]
    OpenError { target: String, reason: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GitHubToolsError>;
