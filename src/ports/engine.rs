use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid scratch file name '{0}'")]
    InvalidName(String),

    #[error("scratch file '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with {status}: {log}")]
    Exec { status: String, log: String },

    #[error("transcoder unavailable: {0}")]
    Unavailable(String),
}

/// One diagnostic line emitted by the engine while a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineLog {
    /// Encoder position reached, in seconds of output.
    Progress { seconds: f64, line: String },
    Message(String),
}

impl EngineLog {
    pub fn line(&self) -> &str {
        match self {
            EngineLog::Progress { line, .. } => line,
            EngineLog::Message(line) => line,
        }
    }
}

/// The transcoding engine injected into the pipeline.
///
/// Files live in one flat scratch namespace owned by the engine. Loading and
/// disposing of the engine is the caller's concern; implementations must be
/// ready to run commands once constructed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Create or overwrite a scratch file
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError>;

    async fn delete_file(&self, name: &str) -> Result<(), EngineError>;

    /// Run one command line to completion, relative to the scratch namespace
    async fn exec(&self, args: &[String]) -> Result<(), EngineError>;

    /// Live stream of diagnostic lines
    fn subscribe_logs(&self) -> broadcast::Receiver<EngineLog>;
}

/// Scratch names are flat: no separators, no parent references.
pub fn validate_name(name: &str) -> Result<(), EngineError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(EngineError::InvalidName(name.to_string()));
    }
    Ok(())
}
