use std::fmt;

#[derive(Debug)]
pub enum CliError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    PostcardError(postcard::Error),
    ProgramValidation(String),
    InvalidInput(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::IoError(e) => write!(f, "IO error: {e}"),
            CliError::JsonError(e) => write!(f, "JSON error: {e}"),
            CliError::PostcardError(e) => write!(f, "Postcard error: {e}"),
            CliError::ProgramValidation(msg) => write!(f, "Program validation error: {msg}"),
            CliError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        CliError::IoError(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        CliError::JsonError(error)
    }
}

impl From<postcard::Error> for CliError {
    fn from(error: postcard::Error) -> Self {
        CliError::PostcardError(error)
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
