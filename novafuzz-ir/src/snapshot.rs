use crate::errors::SnapshotError;
use crate::Program;

/// Current wire version for encoded program snapshots. Bump whenever the
/// encoded shape of [`Program`]/[`crate::Instruction`]/[`crate::Operation`]
/// changes in a way that breaks postcard compatibility.
pub const SNAPSHOT_VERSION: u16 = 1;

#[derive(serde::Serialize, serde::Deserialize)]
struct Versioned<T> {
    version: u16,
    payload: T,
}

/// Encode a sequence of programs into the versioned binary snapshot format
/// used both for corpus export and for the transport's `sync` payload.
pub fn encode_programs(programs: &[Program]) -> Result<Vec<u8>, SnapshotError> {
    let envelope = Versioned {
        version: SNAPSHOT_VERSION,
        payload: programs,
    };
    postcard::to_allocvec(&envelope).map_err(SnapshotError::Encode)
}

/// Decode a snapshot produced by [`encode_programs`]. Rejects any version
/// other than [`SNAPSHOT_VERSION`] rather than guessing at compatibility.
pub fn decode_programs(bytes: &[u8]) -> Result<Vec<Program>, SnapshotError> {
    let envelope: Versioned<Vec<Program>> =
        postcard::from_bytes(bytes).map_err(SnapshotError::Decode)?;
    if envelope.version != SNAPSHOT_VERSION {
        log::warn!(
            "refusing to decode snapshot with version {}, expected {}",
            envelope.version,
            SNAPSHOT_VERSION
        );
        return Err(SnapshotError::UnsupportedVersion(u32::from(envelope.version)));
    }
    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::ProgramBuilder, instruction::Instruction, operation::Operation};

    fn sample_program() -> Program {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(42), vec![]))
            .unwrap();
        b.finalize().unwrap()
    }

    #[test]
    fn round_trips_a_program_list() {
        let programs = vec![sample_program(), sample_program()];
        let encoded = encode_programs(&programs).unwrap();
        let decoded = decode_programs(&encoded).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].content_hash(), programs[0].content_hash());
    }

    #[test]
    fn rejects_unknown_version() {
        #[derive(serde::Serialize)]
        struct OtherVersion {
            version: u16,
            payload: Vec<Program>,
        }
        let bytes = postcard::to_allocvec(&OtherVersion {
            version: SNAPSHOT_VERSION + 1,
            payload: vec![sample_program()],
        })
        .unwrap();

        let err = decode_programs(&bytes).unwrap_err();
        assert!(matches!(err, SnapshotError::UnsupportedVersion(_)));
    }
}
