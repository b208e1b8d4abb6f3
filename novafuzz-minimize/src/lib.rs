//! Fixpoint program minimizer: repeatedly applies a fixed pipeline of
//! reducers to a program until none of them can make further progress
//! without losing the tracked coverage/outcome aspects, then runs a
//! post-processing pass once to patch up cosmetic regressions.

pub mod code;
pub mod helper;
pub mod keep_alive;
pub mod post_processor;
pub mod reducers;

use rand::RngCore;

use novafuzz_ir::aspects::{Evaluator, ProgramAspects};
use novafuzz_ir::executor::Executor;
use novafuzz_ir::Program;

pub use helper::{MinimizationHelper, MinimizerConfig};

/// Minimizes `program` against `aspects`, re-executing candidates through
/// `executor` and judging them with `evaluator`. Runs every reducer in a
/// fixed order to a fixpoint, then a single post-processing pass, then
/// strips the nops the reducers left behind.
pub fn minimize<X: Executor, E: Evaluator, R: RngCore>(
    program: Program,
    aspects: ProgramAspects,
    executor: &mut X,
    evaluator: &E,
    config: MinimizerConfig,
    rng: &mut R,
) -> Program {
    let max_iterations = config.max_iterations;
    let mut helper = MinimizationHelper::new(program, aspects, executor, evaluator, config, rng);

    let mut converged = false;
    for _ in 0..max_iterations.max(1) {
        helper.reset_did_reduce();

        reducers::generic::reduce(&mut helper);
        reducers::block::reduce(&mut helper);
        reducers::simplifying::reduce(&mut helper);
        reducers::loop_reducer::reduce(&mut helper);
        reducers::inlining::reduce(&mut helper);
        reducers::reassignment::reduce(&mut helper);
        reducers::variadic::reduce(&mut helper);
        reducers::deduplicating::reduce(&mut helper);

        if !helper.did_reduce() {
            converged = true;
            break;
        }
    }

    if !converged {
        log::error!(
            "minimizer fixpoint did not converge after {max_iterations} iterations; a reducer is likely \
             oscillating or making no real progress, returning the program as of the last iteration"
        );
    }

    post_processor::run(&mut helper, rng);

    helper.into_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::aspects::{EdgeCoverageEvaluator, OutcomeClass};
    use novafuzz_ir::builder::ProgramBuilder;
    use novafuzz_ir::executor::InMemoryExecutor;
    use novafuzz_ir::operation::{BinaryOperator, Operation};
    use novafuzz_ir::Instruction;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    #[test]
    fn minimize_drops_dead_code_while_preserving_the_tracked_outcome() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(3), vec![])).unwrap();
        b.append(Instruction::new(
            Operation::BinaryOperation(BinaryOperator::Add),
            vec![0, 1],
        ))
        .unwrap();
        b.append(Instruction::new(Operation::Return, vec![3])).unwrap();
        let program = b.finalize().unwrap();
        let original_len = program.instructions.len();

        let aspects = ProgramAspects {
            edges: BTreeSet::new(),
            outcome: OutcomeClass::Succeeded,
        };

        let mut executor = InMemoryExecutor::new();
        let evaluator = EdgeCoverageEvaluator::new();
        let mut rng = SmallRng::seed_from_u64(42);

        let result = minimize(
            program,
            aspects,
            &mut executor,
            &evaluator,
            MinimizerConfig {
                num_test_executions: 1,
                ..Default::default()
            },
            &mut rng,
        );

        assert!(result.instructions.len() <= original_len);
        assert!(result.is_statically_valid());
    }
}
