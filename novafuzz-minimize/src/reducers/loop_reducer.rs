//! Loop-specific simplifications: normalize while/do-while/for loops down to
//! a single `RepeatLoop` shape, shrink existing repeat counts along a fixed
//! ladder, and merge nested repeat loops whose inner counter is unused.

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;
use novafuzz_ir::Instruction;

use crate::code;
use crate::helper::MinimizationHelper;

/// Candidate iteration counts tried from smallest to largest; the first one
/// that still reproduces the tracked aspects wins.
const ITERATION_LADDER: [u64; 8] = [5, 10, 25, 50, 100, 250, 500, 1000];

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    progress |= normalize_to_repeat_loop(helper);
    progress |= shrink_repeat_counts(helper);
    progress |= merge_nested_repeat_loops(helper);
    progress
}

fn normalize_to_repeat_loop<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let len = helper.program().instructions.len();

    for begin in 0..len {
        if helper.is_pinned(begin) {
            continue;
        }
        let op = helper.program().instructions[begin].operation.clone();

        match op {
            Operation::BeginForLoop => {
                let end = code::find_matching_end(helper.program(), begin);
                if helper.is_pinned(end) {
                    continue;
                }
                let new_begin = Instruction::new(Operation::BeginRepeatLoop { iterations: ITERATION_LADDER[0] }, vec![]);
                let new_end = Instruction::new(Operation::EndRepeatLoop, vec![]);
                if helper.try_replacements(vec![(begin, new_begin), (end, new_end)]) {
                    return true;
                }
            }
            Operation::BeginWhileLoop | Operation::BeginDoWhileLoop => {
                let end = code::find_matching_end(helper.program(), begin);
                if helper.is_pinned(end) {
                    continue;
                }
                // While/do-while carry no inner output; a repeat loop needs a
                // counter slot, so insert one at the loop's variable boundary.
                let mut candidate = helper.program().clone();
                let boundary = code::variables_defined_before(&candidate, begin);
                code::shift_variable_references(&mut candidate, boundary, 1, begin);
                candidate.instructions[begin] = Instruction::new(Operation::BeginRepeatLoop { iterations: ITERATION_LADDER[0] }, vec![]);
                candidate.instructions[end] = Instruction::new(Operation::EndRepeatLoop, vec![]);
                if helper.test_and_commit(candidate) {
                    return true;
                }
            }
            _ => {}
        }
    }

    false
}

fn shrink_repeat_counts<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    let len = helper.program().instructions.len();

    for idx in 0..len {
        if helper.is_pinned(idx) {
            continue;
        }
        let Operation::BeginRepeatLoop { iterations } = helper.program().instructions[idx].operation else {
            continue;
        };
        for &candidate_count in ITERATION_LADDER.iter() {
            if candidate_count >= iterations {
                break;
            }
            let new_instr = Instruction::new(Operation::BeginRepeatLoop { iterations: candidate_count }, vec![]);
            if helper.try_replacing(idx, new_instr) {
                progress = true;
                break;
            }
        }
    }

    progress
}

/// Folds `repeat(N) { repeat(M) { body } }` into a single `repeat(N*M) {
/// body }` when the inner loop's counter variable is never read anywhere and
/// the outer loop's body is otherwise empty (already nopped down).
fn merge_nested_repeat_loops<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let pairs = code::all_block_pairs(helper.program());

    for (outer_begin, outer_end) in &pairs {
        if helper.is_pinned(*outer_begin) || helper.is_pinned(*outer_end) {
            continue;
        }
        let Operation::BeginRepeatLoop { iterations: outer_iterations } = helper.program().instructions[*outer_begin].operation else {
            continue;
        };

        let Some(inner_begin) = (outer_begin + 1..*outer_end).find(|&i| {
            !helper.program().instructions[i].is_nop() && matches!(helper.program().instructions[i].operation, Operation::BeginRepeatLoop { .. })
        }) else {
            continue;
        };
        let inner_end = code::find_matching_end(helper.program(), inner_begin);
        if inner_end != outer_end - 1 {
            continue; // outer body holds more than just the inner loop
        }
        if helper.is_pinned(inner_begin) || helper.is_pinned(inner_end) {
            continue;
        }
        let only_inner_loop = (outer_begin + 1..inner_begin).all(|i| helper.program().instructions[i].is_nop());
        if !only_inner_loop {
            continue;
        }
        let Operation::BeginRepeatLoop { iterations: inner_iterations } = helper.program().instructions[inner_begin].operation else {
            continue;
        };
        let Some(merged_iterations) = outer_iterations.checked_mul(inner_iterations) else {
            continue;
        };

        let counter_var = code::variables_defined_before(helper.program(), inner_begin);
        let counter_unused = helper
            .program()
            .instructions
            .iter()
            .all(|instr| !instr.inputs.contains(&counter_var));
        if !counter_unused {
            continue;
        }

        // Nopping preserves each instruction's output slot count, so the
        // counter variable's numbering stays stable; `remove_nops` reclaims
        // the dead slot once minimization finishes.
        let mut candidate = helper.program().clone();
        candidate.instructions[*outer_begin] = Instruction::new(Operation::BeginRepeatLoop { iterations: merged_iterations }, vec![]);
        candidate.instructions[inner_begin].nop();
        candidate.instructions[inner_end].nop();
        if helper.test_and_commit(candidate) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::aspects::{EdgeCoverageEvaluator, OutcomeClass, ProgramAspects};
    use novafuzz_ir::builder::ProgramBuilder;
    use novafuzz_ir::executor::InMemoryExecutor;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn helper_with(
        program: novafuzz_ir::Program,
        executor: &mut InMemoryExecutor,
        evaluator: &EdgeCoverageEvaluator,
        rng: &mut SmallRng,
    ) -> MinimizationHelper<'_, InMemoryExecutor, EdgeCoverageEvaluator> {
        let aspects = ProgramAspects {
            edges: BTreeSet::new(),
            outcome: OutcomeClass::Succeeded,
        };
        MinimizationHelper::new(
            program,
            aspects,
            executor,
            evaluator,
            crate::helper::MinimizerConfig {
                num_test_executions: 1,
                ..Default::default()
            },
            rng,
        )
    }

    #[test]
    fn for_loop_normalizes_to_repeat_loop() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::BeginForLoop, vec![])).unwrap();
        b.append(Instruction::new(Operation::EndForLoop, vec![])).unwrap();
        let program = b.finalize().unwrap();

        let mut executor = InMemoryExecutor::new();
        let evaluator = EdgeCoverageEvaluator::new();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut helper = helper_with(program, &mut executor, &evaluator, &mut rng);

        assert!(normalize_to_repeat_loop(&mut helper));
        assert!(matches!(
            helper.program().instructions[0].operation,
            Operation::BeginRepeatLoop { .. }
        ));
        assert!(helper.program().is_statically_valid());
    }

    #[test]
    fn repeat_count_shrinks_along_ladder() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::BeginRepeatLoop { iterations: 2000 }, vec![]))
            .unwrap();
        b.append(Instruction::new(Operation::EndRepeatLoop, vec![])).unwrap();
        let program = b.finalize().unwrap();

        let mut executor = InMemoryExecutor::new();
        let evaluator = EdgeCoverageEvaluator::new();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut helper = helper_with(program, &mut executor, &evaluator, &mut rng);

        assert!(shrink_repeat_counts(&mut helper));
        assert!(matches!(
            helper.program().instructions[0].operation,
            Operation::BeginRepeatLoop { iterations: 5 }
        ));
    }
}
