//! Shrinks variadic operations (array/template literals, calls,
//! constructions) one trailing input at a time down towards their statically
//! required minimum arity.

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::Instruction;

use crate::helper::MinimizationHelper;

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    let mut idx = helper.program().instructions.len();

    while idx > 0 {
        idx -= 1;
        if helper.is_pinned(idx) {
            continue;
        }
        loop {
            let op = helper.program().instructions[idx].operation.clone();
            if !op.is_variadic() || op.num_inputs() <= op.variadic_minimum_inputs() {
                break;
            }
            let new_op = op.with_one_fewer_input();
            let mut new_inputs = helper.program().instructions[idx].inputs.clone();
            new_inputs.truncate(new_op.num_inputs());
            let new_instr = Instruction::new(new_op, new_inputs);
            if !helper.try_replacing(idx, new_instr) {
                break;
            }
            progress = true;
        }
    }

    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::aspects::{EdgeCoverageEvaluator, OutcomeClass, ProgramAspects};
    use novafuzz_ir::builder::ProgramBuilder;
    use novafuzz_ir::executor::InMemoryExecutor;
    use novafuzz_ir::operation::Operation;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    #[test]
    fn shrinks_array_literal_to_empty() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap();
        b.append(Instruction::new(Operation::CreateArray(2), vec![0, 1])).unwrap();
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
        assert!(matches!(helper.program().instructions[2].operation, Operation::CreateArray(0)));
    }
}
