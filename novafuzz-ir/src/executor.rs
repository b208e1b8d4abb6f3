use std::time::Duration;

use crate::operation::{BinaryOperator, Operation};
use crate::Program;

/// The terminal state of one execution of a [`Program`] against a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(i32),
    Crashed(i32),
    TimedOut,
}

/// The result of running one [`Program`] through an [`Executor`].
///
/// `fuzzout` carries whatever side-channel data the target exposes about its
/// own execution (a coverage trace, in `InMemoryExecutor`'s case) — the
/// analogue of a shared-memory trace buffer in a real harness.
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: Outcome,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub fuzzout: Vec<u8>,
    pub exec_time: Duration,
}

/// Runs programs against a target. Implementations are externally
/// synchronized: only one execution may be in flight per executor at a time,
/// hence `&mut self`.
pub trait Executor {
    fn execute(&mut self, program: &Program, timeout: Duration) -> Execution;
}

/// A dependency-free reference executor that interprets a small subset of
/// [`Operation`] over `i64` values well enough to produce deterministic
/// outcomes and a synthetic coverage trace. Stands in for a real
/// target-engine harness, which stays out of scope.
///
/// Recognised behavior:
/// - arithmetic (`BinaryOperation`/`UnaryOperation`/`Compare`) is evaluated
///   on integer operands tracked per variable slot,
/// - `BinaryOperation(Div)` by zero produces [`Outcome::Crashed`],
/// - `Throw` produces [`Outcome::Failed`],
/// - `Return` ends execution early with [`Outcome::Succeeded`],
/// - every other operation is treated as opaque (its outputs, if any, are
///   unknown values) but still contributes a coverage edge.
#[derive(Debug, Default)]
pub struct InMemoryExecutor;

impl InMemoryExecutor {
    pub fn new() -> Self {
        Self
    }

    fn edge_id(instruction_index: usize, operation: &Operation) -> u32 {
        let discriminant = std::mem::discriminant(operation);
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        use std::hash::{Hash, Hasher};
        instruction_index.hash(&mut hasher);
        discriminant.hash(&mut hasher);
        hasher.finish() as u32
    }
}

impl Executor for InMemoryExecutor {
    fn execute(&mut self, program: &Program, timeout: Duration) -> Execution {
        let start = std::time::Instant::now();
        let mut values: Vec<Option<i64>> = Vec::with_capacity(program.variable_count());
        let mut trace = Vec::new();
        let mut outcome = Outcome::Succeeded;

        'run: for (index, instr) in program.instructions.iter().enumerate() {
            if start.elapsed() > timeout {
                log::debug!("execution timed out after {} instructions", index);
                outcome = Outcome::TimedOut;
                break;
            }

            trace.extend_from_slice(&Self::edge_id(index, &instr.operation).to_le_bytes());

            let result = match &instr.operation {
                Operation::LoadInteger(v) => Some(*v),
                Operation::BinaryOperation(op) => {
                    let a = values.get(instr.inputs[0]).copied().flatten();
                    let b = values.get(instr.inputs[1]).copied().flatten();
                    match (a, b) {
                        (Some(a), Some(b)) => match op {
                            BinaryOperator::Add => Some(a.wrapping_add(b)),
                            BinaryOperator::Sub => Some(a.wrapping_sub(b)),
                            BinaryOperator::Mul => Some(a.wrapping_mul(b)),
                            BinaryOperator::Div => {
                                if b == 0 {
                                    outcome = Outcome::Crashed(11);
                                    break 'run;
                                }
                                Some(a.wrapping_div(b))
                            }
                            BinaryOperator::Mod => {
                                if b == 0 {
                                    outcome = Outcome::Crashed(11);
                                    break 'run;
                                }
                                Some(a.wrapping_rem(b))
                            }
                            BinaryOperator::BitAnd => Some(a & b),
                            BinaryOperator::BitOr => Some(a | b),
                            BinaryOperator::BitXor => Some(a ^ b),
                            BinaryOperator::LShift => Some(a.wrapping_shl(b as u32)),
                            BinaryOperator::RShift => Some(a.wrapping_shr(b as u32)),
                            BinaryOperator::LogicAnd => Some(i64::from(a != 0 && b != 0)),
                            BinaryOperator::LogicOr => Some(i64::from(a != 0 || b != 0)),
                        },
                        _ => None,
                    }
                }
                Operation::Throw => {
                    outcome = Outcome::Failed(1);
                    break;
                }
                Operation::Return => {
                    break;
                }
                _ => None,
            };

            for _ in 0..instr.num_outputs() {
                values.push(result);
            }
            for _ in 0..instr.num_inner_outputs() {
                values.push(None);
            }
        }

        Execution {
            outcome,
            stdout: Vec::new(),
            stderr: Vec::new(),
            fuzzout: trace,
            exec_time: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;
    use crate::instruction::Instruction;

    #[test]
    fn division_by_zero_crashes() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![]))
            .unwrap();
        b.append(Instruction::new(Operation::LoadInteger(0), vec![]))
            .unwrap();
        b.append(Instruction::new(
            Operation::BinaryOperation(BinaryOperator::Div),
            vec![0, 1],
        ))
        .unwrap();
        let program = b.finalize().unwrap();

        let execution = InMemoryExecutor::new().execute(&program, Duration::from_secs(1));
        assert_eq!(execution.outcome, Outcome::Crashed(11));
    }

    #[test]
    fn successful_program_produces_a_trace() {
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
        let program = b.finalize().unwrap();

        let execution = InMemoryExecutor::new().execute(&program, Duration::from_secs(1));
        assert_eq!(execution.outcome, Outcome::Succeeded);
        assert_eq!(execution.fuzzout.len(), program.instructions.len() * 4);
    }
}
