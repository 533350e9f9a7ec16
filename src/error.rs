use thiserror::Error;

/// An error returned by a failed call into the display transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{operation} failed: [{code:#x}] {message}")]
    Os {
        operation: &'static str,
        code: i32,
        message: String,
    },
    #[error("{0} failed")]
    Failed(&'static str),
    #[error("display monitor has no usable physical monitor")]
    NoPhysicalMonitor,
    #[error("capabilities string contains invalid UTF-8")]
    InvalidCapabilitiesString,
}

impl TransportError {
    /// Returns the platform's error text in the `Error [CODE] MESSAGE` form,
    /// if the failure carried one.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            TransportError::Os { code, message, .. } => {
                Some(format!("Error [{}] {}", code, message.trim_end()))
            }
            _ => None,
        }
    }
}

/// A malformed command line.
#[derive(Debug, Error, PartialEq)]
pub enum UsageError {
    #[error("Unsupported argument: {0}")]
    UnsupportedArgument(String),
    #[error("{flag} requires {what}")]
    MissingParameter {
        flag: &'static str,
        what: &'static str,
    },
    #[error("You cannot specify both get and set operations in a single command")]
    GetAndSet,
    #[error("--toggle cannot be combined with get or set operations")]
    ToggleWithGetOrSet,
    /// Rejected by argh, including numbers that failed to parse. Holds argh's
    /// message.
    #[error("{0}")]
    Rejected(String),
}
