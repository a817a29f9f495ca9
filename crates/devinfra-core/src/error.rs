use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevinfraError {
    #[error("devinfra not initialized; run 'devinfra init' first")]
    NotInitialized,

    #[error("home directory not found: set HOME or pass --config-dir")]
    HomeNotFound,

    // -- validation ---------------------------------------------------------
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid port {port}: {reason}")]
    InvalidPort { port: i64, reason: String },

    #[error("port must be an integer: {0}")]
    PortNotNumeric(String),

    #[error("invalid service '{0}': expected name:port")]
    InvalidServiceSpec(String),

    #[error("duplicate service name: {0}")]
    DuplicateServiceName(String),

    #[error("duplicate port: {0}")]
    DuplicatePort(u16),

    #[error("unknown flavor '{flavor}'; available: {available}")]
    UnknownFlavor { flavor: String, available: String },

    #[error("invalid mode '{0}': use 'docker' or 'host'")]
    InvalidMode(String),

    #[error("invalid directory {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("invalid git url '{url}': {reason}")]
    InvalidGitUrl { url: String, reason: String },

    // -- conflicts ----------------------------------------------------------
    #[error("project '{0}' already exists")]
    ProjectExists(String),

    #[error("directory {dir} is already registered as project '{project}'")]
    DirectoryRegistered { dir: PathBuf, project: String },

    #[error("port {port} is already used by host-mode project '{project}'")]
    PortInUse { port: u16, project: String },

    #[error("flavor '{flavor}' already added to project '{project}'")]
    FlavorExists { flavor: String, project: String },

    #[error("flavor name '{flavor}' conflicts with a service name in project '{project}'")]
    FlavorShadowsService { flavor: String, project: String },

    // -- not found ----------------------------------------------------------
    #[error("project '{0}' not found in registry")]
    ProjectNotFound(String),

    // -- external tools -----------------------------------------------------
    #[error("required tool '{0}' is not installed or not on PATH")]
    ToolMissing(String),

    #[error("{command} failed: {output}")]
    ToolFailed { command: String, output: String },

    #[error("{command} timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("{0} was cancelled")]
    Cancelled(String),

    // -- persistence --------------------------------------------------------
    #[error("registry at {path} is corrupt: {source}")]
    CorruptRegistry {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse error taxonomy used by callers that pick a remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    ExternalTool,
    Timeout,
    Cancelled,
    Persistence,
    CorruptRegistry,
    Environment,
}

impl DevinfraError {
    pub fn kind(&self) -> ErrorKind {
        use DevinfraError::*;
        match self {
            NotInitialized | HomeNotFound => ErrorKind::Environment,
            InvalidName { .. }
            | InvalidPort { .. }
            | PortNotNumeric(_)
            | InvalidServiceSpec(_)
            | DuplicateServiceName(_)
            | DuplicatePort(_)
            | UnknownFlavor { .. }
            | InvalidMode(_)
            | InvalidDirectory { .. }
            | InvalidGitUrl { .. } => ErrorKind::Validation,
            ProjectExists(_)
            | DirectoryRegistered { .. }
            | PortInUse { .. }
            | FlavorExists { .. }
            | FlavorShadowsService { .. } => ErrorKind::Conflict,
            ProjectNotFound(_) => ErrorKind::NotFound,
            ToolMissing(_) | ToolFailed { .. } => ErrorKind::ExternalTool,
            Timeout { .. } => ErrorKind::Timeout,
            Cancelled(_) => ErrorKind::Cancelled,
            CorruptRegistry { .. } => ErrorKind::CorruptRegistry,
            Persistence { .. } | Io(_) | Yaml(_) | Json(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, DevinfraError>;
