use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("could not connect to the directory server on {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    #[error("unknown service '{0}': no start order is defined for it")]
    UnknownService(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("failed to spawn '{program}': {reason}")]
    CommandSpawn { program: String, reason: String },

    #[error("command '{command}' exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("state database error: {0}")]
    StateDb(String),

    #[error("state '{key}' for '{component}' is not a {expected}")]
    StateType {
        component: String,
        key: String,
        expected: &'static str,
    },

    #[error("step [{index}/{total}] '{description}' failed")]
    Step {
        index: usize,
        total: usize,
        description: String,
        #[source]
        source: Box<InstallError>,
    },

    #[error("invalid certificate: {0}")]
    Certificate(String),

    #[error("invalid service name '{0}'")]
    InvalidName(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl InstallError {
    /// True for the expected-absence outcome that callers treat as "nothing to do".
    pub fn is_not_found(&self) -> bool {
        matches!(self, InstallError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, InstallError::AlreadyExists(_))
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;
