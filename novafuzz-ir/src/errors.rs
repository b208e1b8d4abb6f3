use std::fmt;

use crate::operation::Operation;

/// Errors returned while building or validating a [`Program`](crate::Program).
#[derive(Debug, Clone)]
pub enum ProgramValidationError {
    VariableNotDefined(usize),
    InvalidNumberOfInputs {
        is: usize,
        expected: usize,
    },
    InvalidBlockEnd {
        begin: Operation,
        end: Operation,
    },
    ScopeStillOpen,
    EmptyProgram,
}

impl fmt::Display for ProgramValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramValidationError::VariableNotDefined(idx) => {
                write!(f, "variable {idx} is not defined in the current scope")
            }
            ProgramValidationError::InvalidNumberOfInputs { is, expected } => {
                write!(f, "expected {expected} inputs, got {is}")
            }
            ProgramValidationError::InvalidBlockEnd { begin, end } => {
                write!(f, "{end} does not close {begin}")
            }
            ProgramValidationError::ScopeStillOpen => {
                write!(f, "program ends with an unclosed block scope")
            }
            ProgramValidationError::EmptyProgram => write!(f, "program has no instructions"),
        }
    }
}

impl std::error::Error for ProgramValidationError {}

/// Errors returned by the versioned snapshot codec.
#[derive(Debug)]
pub enum SnapshotError {
    Encode(postcard::Error),
    Decode(postcard::Error),
    UnsupportedVersion(u32),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Encode(e) => write!(f, "failed to encode snapshot: {e}"),
            SnapshotError::Decode(e) => write!(f, "failed to decode snapshot: {e}"),
            SnapshotError::UnsupportedVersion(v) => {
                write!(f, "unsupported snapshot version {v}")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}
