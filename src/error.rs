use crate::model::ValueType;
use std::path::PathBuf;
use thiserror::Error;

/// Schema could not be used. Fatal at startup.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("entry {index} has an empty VariableName")]
    EmptyName { index: usize },

    #[error("VariableName '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("entry '{field}' has an invalid AllowedChars pattern")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("entry '{field}' has MinLength {min} greater than MaxLength {max}")]
    InvalidBounds { field: String, min: usize, max: usize },
}

/// Why a single field was rejected. Display is the inline message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("This field cannot be empty")]
    Required,

    #[error("Minimum length of {min} characters is required")]
    TooShort { min: usize },

    #[error("Maximum length of {max} characters exceeded")]
    TooLong { max: usize },

    #[error("Expecting a {expected}")]
    TypeMismatch { expected: ValueType },

    #[error("Input contains invalid characters")]
    PatternMismatch,
}

/// Failure to start the terminal session for a rendered script.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to prepare temporary script file")]
    TempFile {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("launching a terminal is not supported on {os}")]
    UnsupportedPlatform { os: String },
}

/// Aborts one submission attempt; the form stays usable.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to read script template {}", path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to substitute values into the script template")]
    Template(#[source] regex::Error),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}
