use std::fmt;

/// Errors surfaced by corpus snapshot export/import, the only two fallible
/// corpus operations per the contract table in §4.1.
#[derive(Debug)]
pub enum CorpusError {
    Encode(novafuzz_ir::errors::SnapshotError),
    Decode(novafuzz_ir::errors::SnapshotError),
}

impl fmt::Display for CorpusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusError::Encode(e) => write!(f, "failed to export corpus state: {e}"),
            CorpusError::Decode(e) => write!(f, "failed to import corpus state: {e}"),
        }
    }
}

impl std::error::Error for CorpusError {}
