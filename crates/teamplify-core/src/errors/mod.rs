use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Base trait for all runner errors
pub trait TeamplifyError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Every problem found by a single validation pass.
///
/// Messages keep the order they were found in: section iteration order,
/// then option order inside each section. One message renders bare, several
/// render as a count header followed by an indented list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    /// Returns `None` when there is nothing to report.
    pub fn from_messages(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self { messages })
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.messages.as_slice() {
            return write!(f, "{}", only);
        }
        write!(f, "{} errors found:", self.messages.len())?;
        for message in &self.messages {
            write!(f, "\n -> {}", message)?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("File not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse configuration, line {line}: {message}")]
    ConfigParseError { line: usize, message: String },

    #[error("Failed to write configuration to '{}': {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error reading config: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl TeamplifyError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::WriteFailed { .. } => "CONFIG_WRITE_FAILED",
            ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ConfigNotFound { .. } | ConfigError::ConfigParseError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_validation_error_renders_bare() {
        let errors =
            ValidationErrors::from_messages(vec!["[main] product_key: Product key is missing".into()])
                .unwrap();
        assert_eq!(errors.to_string(), "[main] product_key: Product key is missing");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_multiple_validation_errors_render_with_count() {
        let errors = ValidationErrors::from_messages(vec![
            "[web] port: Must be an integer. You provided: gav".into(),
            "Unknown section: [extra]".into(),
        ])
        .unwrap();
        assert_eq!(
            errors.to_string(),
            "2 errors found:\n -> [web] port: Must be an integer. You provided: gav\n -> Unknown section: [extra]"
        );
    }

    #[test]
    fn test_no_messages_is_not_an_error() {
        assert!(ValidationErrors::from_messages(Vec::new()).is_none());
    }

    #[test]
    fn test_config_error_codes() {
        let error = ConfigError::ConfigNotFound {
            path: PathBuf::from("/nope.ini"),
        };
        assert_eq!(error.to_string(), "File not found: /nope.ini");
        assert_eq!(error.error_code(), "CONFIG_NOT_FOUND");
        assert!(error.is_user_error());

        let error = ConfigError::ConfigParseError {
            line: 3,
            message: "option outside of a section".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration, line 3: option outside of a section"
        );
        assert_eq!(error.error_code(), "CONFIG_PARSE_ERROR");
    }

    #[test]
    fn test_invalid_displays_validation_errors_verbatim() {
        let errors = ValidationErrors::from_messages(vec!["Unknown section: [x]".into()]).unwrap();
        let error = ConfigError::from(errors);
        assert_eq!(error.to_string(), "Unknown section: [x]");
        assert!(!ConfigError::IoError {
            source: std::io::Error::other("disk")
        }
        .is_user_error());
    }
}
