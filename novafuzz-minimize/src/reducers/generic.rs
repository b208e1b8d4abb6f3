//! Single-instruction nopping, generalized from a one-shot linear sweep into
//! a helper-driven reducer: walk the program in reverse, nop whatever isn't
//! pinned and isn't already irreducible.

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;

use crate::helper::MinimizationHelper;

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    let mut idx = helper.program().instructions.len();

    while idx > 0 {
        idx -= 1;
        if helper.is_pinned(idx) {
            continue;
        }
        if !helper.program().instructions[idx].is_noppable() {
            continue;
        }
        if helper.try_nopping(&[idx]) {
            progress = true;
        }
    }

    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::aspects::{OutcomeClass, ProgramAspects};
    use novafuzz_ir::builder::ProgramBuilder;
    use novafuzz_ir::executor::InMemoryExecutor;
    use novafuzz_ir::operation::{BinaryOperator, Operation};
    use novafuzz_ir::{EdgeCoverageEvaluator, Instruction};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;
    use std::time::Duration;

    #[test]
    fn drops_an_unused_load_while_keeping_tracked_edges() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap();
        b.append(Instruction::new(Operation::Return, vec![0])).unwrap();
        let program = b.finalize().unwrap();
        let original_len = program.instructions.len();

        let mut executor = InMemoryExecutor::new();
        let mut evaluator = EdgeCoverageEvaluator::new();
        let execution = executor.execute(&program, Duration::from_secs(1));
        // Only require the edge at the Return instruction's index: removing
        // the dead second load changes its own trace entry, which this
        // aspect set doesn't care about.
        let mut edges = BTreeSet::new();
        edges.extend(
            execution
                .fuzzout
                .chunks_exact(4)
                .nth(2)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
        let _ = evaluator.evaluate(&execution);
        let aspects = ProgramAspects {
            edges,
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

        reduce(&mut helper);
        let result = helper.into_program();
        assert!(result.instructions.len() <= original_len);
        assert!(result.is_statically_valid());
    }

    #[test]
    fn never_nops_a_pinned_index() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap();
        b.append(Instruction::new(
            Operation::BinaryOperation(BinaryOperator::Add),
            vec![0, 1],
        ))
        .unwrap();
        let program = b.finalize().unwrap();

        let mut executor = InMemoryExecutor::new();
        let aspects = ProgramAspects {
            edges: BTreeSet::new(),
            outcome: OutcomeClass::Succeeded,
        };
        let evaluator = EdgeCoverageEvaluator::new();
        let mut rng = SmallRng::seed_from_u64(0);

        let mut helper = MinimizationHelper::new(
            program,
            aspects,
            &mut executor,
            &evaluator,
            crate::helper::MinimizerConfig {
                minimization_limit: 1.0,
                num_test_executions: 1,
                ..Default::default()
            },
            &mut rng,
        );

        assert!(!reduce(&mut helper));
        assert_eq!(helper.program().instructions.len(), 3);
    }
}
