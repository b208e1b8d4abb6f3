pub mod aspects;
pub mod builder;
pub mod errors;
pub mod executor;
pub mod instruction;
pub mod operation;
pub mod snapshot;

pub use aspects::*;
pub use builder::ProgramBuilder;
pub use errors::{ProgramValidationError, SnapshotError};
pub use executor::*;
pub use instruction::Instruction;
pub use operation::{BinaryOperator, CompareOperator, Context, Operation, UnaryOperator};

use std::collections::HashMap;
use std::fmt;

use murmurs::murmur3_x86_32;
use rand::seq::IteratorRandom;
use rand::RngCore;

use crate::builder::ProgramBuilder as Builder;
use crate::operation::Operation as Op;

/// The seed murmur3 is keyed with when hashing a program for deduplication.
/// Arbitrary but fixed so hashes are stable across runs.
const CONTENT_HASH_SEED: u32 = 0x4655_5A31;

/// A sequence of [`Instruction`]s forming a complete, statically valid
/// program in the fuzzer's intermediate representation.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Hash)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Construct a program without validating it. Callers that did not just
    /// run it through a [`ProgramBuilder`] should call
    /// [`Program::is_statically_valid`] before use.
    pub fn unchecked_new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn is_statically_valid(&self) -> bool {
        match Builder::from_program(self) {
            Ok(builder) => builder.finalize().is_ok(),
            Err(_) => false,
        }
    }

    pub fn to_builder(&self) -> Option<ProgramBuilder> {
        Builder::from_program(self).ok()
    }

    /// Total number of variables defined by this program (including inner
    /// outputs), independent of scoping.
    pub fn variable_count(&self) -> usize {
        self.instructions
            .iter()
            .map(|i| i.num_outputs() + i.num_inner_outputs())
            .sum()
    }

    /// Content hash used for corpus deduplication. Computed over the
    /// postcard encoding of `instructions` only — provenance (scheduler
    /// bookkeeping, corpus metadata) never participates, so two
    /// instruction-identical programs always hash identically regardless of
    /// how they were produced.
    pub fn content_hash(&self) -> u32 {
        let encoded = postcard::to_allocvec(&self.instructions)
            .expect("instruction list is always postcard-encodable");
        murmur3_x86_32(&encoded, CONTENT_HASH_SEED)
    }

    /// Remove all `Nop` instructions and renumber variables so indices stay
    /// contiguous. The program must be statically valid before and remains
    /// so after.
    pub fn remove_nops(&mut self) {
        debug_assert!(self.is_statically_valid());

        let mut mapping = HashMap::new();
        let mut next = 0usize;
        let mut next_with_nops = 0usize;

        for instr in &self.instructions {
            for _ in 0..(instr.num_outputs() + instr.num_inner_outputs()) {
                mapping.insert(next_with_nops, next);
                if !matches!(instr.operation, Op::Nop { .. }) {
                    next += 1;
                }
                next_with_nops += 1;
            }
        }

        for instr in &mut self.instructions {
            for input in &mut instr.inputs {
                *input = mapping[input];
            }
        }

        self.instructions
            .retain(|instr| !matches!(instr.operation, Op::Nop { .. }));

        debug_assert!(self.is_statically_valid());
    }

    /// A random instruction index whose instruction executes in `context`,
    /// searching from instruction `from` onward.
    pub fn random_instruction_index_from<R: RngCore>(
        &self,
        rng: &mut R,
        context: Context,
        from: usize,
    ) -> Option<usize> {
        let mut scopes = vec![Context::Global];
        let mut matching = Vec::new();

        for (i, instr) in self.instructions.iter().enumerate() {
            if *scopes.last().expect("global scope always present") == context {
                matching.push(i);
            }

            if instr.is_block_end() {
                scopes.pop();
            }
            if instr.is_block_begin() {
                scopes.push(
                    instr
                        .entered_context_after_execution()
                        .expect("block begin always enters a context"),
                );
            }
        }

        matching.into_iter().filter(|i| *i >= from).choose(rng)
    }

    pub fn random_instruction_index<R: RngCore>(
        &self,
        rng: &mut R,
        context: Context,
    ) -> Option<usize> {
        self.random_instruction_index_from(rng, context, 0)
    }

}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut var_counter = 0usize;
        let mut indent = 0usize;

        for instruction in &self.instructions {
            if indent > 0 {
                let offset = usize::from(instruction.is_block_end());
                write!(f, "{}", "  ".repeat(indent - offset))?;
            }

            if instruction.num_outputs() > 0 {
                for _ in 0..instruction.num_outputs() - 1 {
                    write!(f, "v{var_counter}, ")?;
                    var_counter += 1;
                }
                write!(f, "v{var_counter} <- ")?;
                var_counter += 1;
            }

            write!(f, "{}", instruction.operation)?;

            if !instruction.inputs.is_empty() {
                write!(f, "(")?;
                for (i, input) in instruction.inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "v{input}")?;
                }
                write!(f, ")")?;
            }

            if instruction.num_inner_outputs() > 0 {
                write!(f, " -> ")?;
                for _ in 0..instruction.num_inner_outputs() - 1 {
                    write!(f, "v{var_counter}, ")?;
                    var_counter += 1;
                }
                write!(f, "v{var_counter}")?;
                var_counter += 1;
            }
            writeln!(f)?;

            if instruction.is_block_begin() {
                indent += 1;
            }
            if instruction.is_block_end() {
                indent -= 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;

    fn simple_program() -> Program {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![]))
            .unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![]))
            .unwrap();
        b.append(Instruction::new(
            Operation::BinaryOperation(BinaryOperator::Add),
            vec![0, 1],
        ))
        .unwrap();
        b.finalize().unwrap()
    }

    #[test]
    fn content_hash_is_deterministic_and_sensitive_to_instructions() {
        let a = simple_program();
        let b = simple_program();
        assert_eq!(a.content_hash(), b.content_hash());

        let mut c = simple_program();
        c.instructions.push(Instruction::new(Operation::Return, vec![2]));
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn remove_nops_renumbers_inputs() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![]))
            .unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![]))
            .unwrap();
        let mut program = b.finalize().unwrap();
        program.instructions[0].nop();
        program.instructions.push(Instruction::new(Operation::Return, vec![1]));

        program.remove_nops();

        assert_eq!(program.instructions.len(), 2);
        assert_eq!(program.instructions[1].inputs, vec![0]);
    }

    #[test]
    fn is_statically_valid_rejects_unbalanced_programs() {
        let program = Program::unchecked_new(vec![Instruction::new(Operation::BeginIf, vec![])]);
        assert!(!program.is_statically_valid());
    }
}
