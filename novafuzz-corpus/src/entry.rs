use novafuzz_ir::aspects::{OutcomeClass, ProgramAspects};
use novafuzz_ir::builder::ProgramBuilder;
use novafuzz_ir::operation::Operation;
use novafuzz_ir::{Instruction, Program};

/// One accepted program, plus the bookkeeping the schedulers need.
///
/// `age` counts how many times this entry has been returned for mutation;
/// once it reaches a strategy's `min_mutations_per_sample` it becomes
/// eligible for eviction (subject to `min_size`).
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub program: Program,
    pub age: u32,
    pub hash: u32,
    pub last_outcome: OutcomeClass,
    pub last_aspects: ProgramAspects,
}

impl CorpusEntry {
    pub fn new(program: Program, aspects: ProgramAspects) -> Self {
        let hash = program.content_hash();
        Self {
            program,
            age: 0,
            hash,
            last_outcome: aspects.outcome,
            last_aspects: aspects,
        }
    }
}

/// A single statically valid `undefined` program plus a placeholder
/// `Succeeded`/no-edges aspects record. Every scheduler seeds its entry list
/// with this at construction, so the corpus is never empty for a caller that
/// selects before its first real `add`.
pub(crate) fn trivial_seed() -> (Program, ProgramAspects) {
    let mut builder = ProgramBuilder::new();
    builder
        .append(Instruction::new(Operation::LoadUndefined, vec![]))
        .expect("a single LoadUndefined is always a valid program");
    let program = builder.finalize().expect("builder tracked a balanced program");
    let aspects = ProgramAspects {
        edges: Default::default(),
        outcome: OutcomeClass::Succeeded,
    };
    (program, aspects)
}
