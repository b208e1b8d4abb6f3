//! Folds `Reassign` chains: once `dst = src` has executed, every later
//! reference to `dst` can read `src` directly, leaving the `Reassign`
//! instruction itself nopped. Scope-respecting: a mapping introduced inside
//! a block is popped at that block's end, so it never rewrites a reference
//! that lexically follows the block.

use std::collections::HashMap;

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;

use crate::helper::MinimizationHelper;

fn resolve(scopes: &[HashMap<usize, usize>], var: usize) -> Option<usize> {
    scopes.iter().rev().find_map(|layer| layer.get(&var).copied())
}

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut candidate = helper.program().clone();
    let mut scopes: Vec<HashMap<usize, usize>> = vec![HashMap::new()];
    let mut any = false;

    for idx in 0..candidate.instructions.len() {
        let is_block_begin = candidate.instructions[idx].is_block_begin();
        if candidate.instructions[idx].is_block_end() && scopes.len() > 1 {
            scopes.pop();
        }

        if !helper.is_pinned(idx) {
            let instr = candidate.instructions[idx].clone();
            if matches!(instr.operation, Operation::Reassign) && !instr.is_nop() {
                let dst = instr.inputs[0];
                let src = instr.inputs[1];
                let root = resolve(&scopes, src).unwrap_or(src);
                scopes
                    .last_mut()
                    .expect("global scope always present")
                    .insert(dst, root);
                candidate.instructions[idx].nop();
                any = true;
            } else {
                for input in &mut candidate.instructions[idx].inputs {
                    if let Some(root) = resolve(&scopes, *input) {
                        *input = root;
                    }
                }
            }
        }

        if is_block_begin {
            scopes.push(HashMap::new());
        }
    }

    if !any {
        return false;
    }
    helper.test_and_commit(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::aspects::{EdgeCoverageEvaluator, OutcomeClass, ProgramAspects};
    use novafuzz_ir::builder::ProgramBuilder;
    use novafuzz_ir::executor::InMemoryExecutor;
    use novafuzz_ir::Instruction;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    #[test]
    fn folds_a_reassignment_chain() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap();
        b.append(Instruction::new(Operation::Reassign, vec![0, 1])).unwrap();
        b.append(Instruction::new(Operation::Return, vec![0])).unwrap();
        let program = b.finalize().unwrap();

        let mut executor = InMemoryExecutor::new();
        let evaluator = EdgeCoverageEvaluator::new();
        let aspects = ProgramAspects {
            edges: BTreeSet::new(),
            outcome: OutcomeClass::Succeeded,
        };
        let mut rng = SmallRng::seed_from_u64(0);
        let mut helper = MinimizationHelper::new(
            program,
            aspects,
            &mut executor,
            &evaluator,
            crate::helper::MinimizerConfig {
                num_test_executions: 1,
                ..Default::default()
            },
            &mut rng,
        );

        assert!(reduce(&mut helper));
        assert_eq!(helper.program().instructions[3].inputs, vec![1]);
        assert!(helper.program().instructions[2].is_nop());
    }

    #[test]
    fn a_reassignment_does_not_escape_its_block() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap(); // v0, dst
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap(); // v1, src
        b.append(Instruction::new(Operation::BeginIf, vec![])).unwrap();
        b.append(Instruction::new(Operation::Reassign, vec![0, 1])).unwrap();
        b.append(Instruction::new(Operation::EndIf, vec![])).unwrap();
        b.append(Instruction::new(Operation::Return, vec![0])).unwrap();
        let program = b.finalize().unwrap();

        let mut executor = InMemoryExecutor::new();
        let evaluator = EdgeCoverageEvaluator::new();
        let aspects = ProgramAspects {
            edges: BTreeSet::new(),
            outcome: OutcomeClass::Succeeded,
        };
        let mut rng = SmallRng::seed_from_u64(0);
        let mut helper = MinimizationHelper::new(
            program,
            aspects,
            &mut executor,
            &evaluator,
            crate::helper::MinimizerConfig {
                num_test_executions: 1,
                ..Default::default()
            },
            &mut rng,
        );

        assert!(reduce(&mut helper));
        // the Reassign folded inside the if-block, but the Return after the
        // block still reads the original dst, not the block-local mapping.
        assert_eq!(helper.program().instructions[5].inputs, vec![0]);
        assert!(helper.program().instructions[3].is_nop());
    }
}
