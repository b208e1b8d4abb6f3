//! Collapses repeated scope-local loads of the same builtin or named
//! variable into a single load, redirecting later references to the first
//! one and nopping the rest.

use std::collections::HashMap;

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;

use crate::code;
use crate::helper::MinimizationHelper;

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let program = helper.program();
    let mut stack: Vec<HashMap<String, usize>> = vec![HashMap::new()];
    let mut duplicates: HashMap<usize, usize> = HashMap::new();

    for (idx, instr) in program.instructions.iter().enumerate() {
        if instr.is_block_end() {
            if stack.len() > 1 {
                stack.pop();
            }
        }

        let key = match &instr.operation {
            Operation::LoadBuiltin(name) => Some(format!("builtin:{name}")),
            Operation::LoadFromScope(name) => Some(format!("scope:{name}")),
            _ => None,
        };

        if let Some(key) = key {
            if !helper.is_pinned(idx) && !instr.is_nop() {
                let existing = stack.iter().rev().find_map(|layer| layer.get(&key).copied());
                if let Some(target) = existing {
                    let own_var = code::variables_defined_before(program, idx);
                    duplicates.insert(own_var, target);
                } else {
                    let own_var = code::variables_defined_before(program, idx);
                    stack.last_mut().unwrap().insert(key, own_var);
                }
            }
        }

        if instr.is_block_begin() {
            stack.push(HashMap::new());
        }
    }

    if duplicates.is_empty() {
        return false;
    }

    let mut candidate = program.clone();
    for instr in &mut candidate.instructions {
        for input in &mut instr.inputs {
            if let Some(&target) = duplicates.get(input) {
                *input = target;
            }
        }
    }
    for (idx, instr) in candidate.instructions.iter_mut().enumerate() {
        let own_var = code::variables_defined_before(program, idx);
        if duplicates.contains_key(&own_var) {
            instr.nop();
        }
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
    fn second_load_of_same_builtin_is_dropped() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadBuiltin("Math".into()), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadBuiltin("Math".into()), vec![])).unwrap();
        b.append(Instruction::new(Operation::Return, vec![1])).unwrap();
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
        assert!(helper.program().instructions[1].is_nop());
        assert_eq!(helper.program().instructions[2].inputs, vec![0]);
    }
}
