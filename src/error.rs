use thiserror::Error;

#[derive(Debug, Error)]
pub enum PilotError {
    /// Transport failure talking to the driver or the completion endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed (driver or completion response bodies)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver answered a command with a W3C error payload
    #[error("Driver command '{command}' failed: {message}")]
    Driver { command: String, message: String },

    /// Session could not be created or is unusable
    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    /// Completion endpoint returned an error status or an unusable body
    #[error("Completion endpoint error: {0}")]
    Completion(String),

    /// Completion text did not follow the `Action:` / `Parameters:` format
    #[error("Failed to parse action response: {0}")]
    ResponseFormat(String),

    /// Completion named an action outside the catalog
    #[error("Invalid action '{name}'. Available actions are: {available:?}")]
    UnknownAction {
        name: String,
        available: Vec<&'static str>,
    },

    /// UI tree document is not well-formed XML
    #[error("Malformed UI tree document: {0}")]
    TreeParse(String),

    #[error("Timed out after {timeout_ms}ms waiting for {condition}")]
    WaitTimeout { condition: String, timeout_ms: u128 },

    /// External program failed to start (is adb on PATH?)
    #[error("Failed to spawn {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External program exited with non-zero status
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Screenshot decode failed: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("App '{app}' is probably not installed on {device}")]
    AppNotInstalled { app: String, device: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PilotError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PilotError::WaitTimeout { .. })
    }

    /// W3C `stale element reference` or `no such element`: the element went
    /// away between lookup and use.
    pub fn is_element_gone(&self) -> bool {
        match self {
            PilotError::Driver { message, .. } => {
                message.starts_with("stale element reference")
                    || message.starts_with("no such element")
            }
            _ => false,
        }
    }
}

pub type PilotResult<T> = Result<T, PilotError>;
