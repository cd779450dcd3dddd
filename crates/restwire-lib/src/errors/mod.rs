use thiserror::Error;

/// Failure raised by a serialization processor.
///
/// Exactly two kinds exist: turning a value into JSON text failed, or
/// turning JSON input into a typed value failed. The codec error is kept
/// as the `source` for diagnostics.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl ProcessorError {
    pub fn is_serialization(&self) -> bool {
        matches!(self, ProcessorError::Serialization(_))
    }

    pub fn is_deserialization(&self) -> bool {
        matches!(self, ProcessorError::Deserialization(_))
    }

    /// The underlying codec error.
    pub fn codec_error(&self) -> &serde_json::Error {
        match self {
            ProcessorError::Serialization(e) | ProcessorError::Deserialization(e) => e,
        }
    }
}

#[derive(Error, Debug)]
pub enum RestwireError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, RestwireError>;

/// Logs a fatal error and exits the process with code 1.
///
/// This function never returns (`-> !`). It is intended for unrecoverable
/// errors during startup.
pub fn handle_fatal(err: RestwireError) -> ! {
    tracing::error!("Fatal error: {}", err);
    std::process::exit(1)
}

/// Maps a `RestwireError` to user-facing CLI output with a hint where one helps.
/// In verbose mode the full cause chain follows.
pub fn handle_command_error(err: &RestwireError) {
    use crate::output;

    match err {
        RestwireError::Config(msg) => {
            output::error(&format!("Configuration error: {}", msg));
            output::info("Check the file passed with --config or named by $RESTWIRE_CONFIG.");
        }
        RestwireError::Io(e) => {
            output::error(&format!("File error: {}", e));
        }
        RestwireError::Processor(e) if e.is_deserialization() => {
            output::error(&format!("Invalid JSON input: {}", e.codec_error()));
        }
        RestwireError::Command(msg) => {
            output::error(&format!("Error: {}", msg));
        }
        _ => {
            output::error(&format!("{}", err));
        }
    }

    if crate::logger::is_verbose() {
        for cause in cause_chain(err) {
            output::info(&format!("  caused by: {}", cause));
        }
    }
}

/// Messages of every `source()` below `err`, outermost first.
pub fn cause_chain(err: &dyn std::error::Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}
