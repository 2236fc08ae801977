use std::path::PathBuf;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("failed to open slideshow: {0}")]
    OpenFailure(String),
    #[error("presentation not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("viewer reported unknown slide id {physical_id} after priming")]
    ProtocolViolation { physical_id: i32 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("slide {index} out of range (slide count {count})")]
    OutOfRange { index: i32, count: i32 },
    #[error("document is closed")]
    DocumentClosed,
    #[error("window capture failed: {0}")]
    Capture(String),
    #[error("failed to export {what}")]
    Export {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<std::io::Error> for AppError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl AppError {
    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn open_failure(message: impl Into<String>) -> Self {
        Self::OpenFailure(message.into())
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn protocol_violation(physical_id: i32) -> Self {
        Self::ProtocolViolation { physical_id }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn out_of_range(index: i32, count: i32) -> Self {
        Self::OutOfRange { index, count }
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub fn export(
        what: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Export {
            what: what.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn protocol_violation_names_the_unmapped_id() {
        let err = AppError::protocol_violation(42);
        assert!(matches!(err, AppError::ProtocolViolation { physical_id: 42 }));
        assert_eq!(
            err.to_string(),
            "viewer reported unknown slide id 42 after priming"
        );
    }

    #[test]
    fn file_not_found_displays_path() {
        let err = AppError::file_not_found("/tmp/deck.ppt");
        assert_eq!(err.to_string(), "presentation not found: /tmp/deck.ppt");
    }
}
