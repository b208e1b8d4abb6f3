//! Removes whole block groups (loops, conditionals, try/catch/finally,
//! code strings, with-statements, classes, plain blocks) once their contents
//! are shown unnecessary. Scans block pairs innermost/rightmost first so
//! nested groups are attempted before their parents.

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;

use crate::code;
use crate::helper::MinimizationHelper;

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    let pairs = code::all_block_pairs(helper.program());

    for (begin, end) in pairs.into_iter().rev() {
        if helper.is_pinned(begin) || helper.is_pinned(end) {
            continue;
        }
        let begin_op = helper.program().instructions[begin].operation.clone();
        let reduced = match &begin_op {
            Operation::BeginWhileLoop
            | Operation::BeginDoWhileLoop
            | Operation::BeginForLoop
            | Operation::BeginRepeatLoop { .. } => reduce_loop_block(helper, begin, end),
            Operation::BeginTry => reduce_try_catch_finally(helper, begin, end),
            Operation::BeginCodeString => reduce_code_string(helper, begin, end),
            Operation::BeginCatch | Operation::BeginFinally => false, // handled as part of their BeginTry group
            _ => helper.try_nopping(&[begin, end]),
        };
        if reduced {
            progress = true;
        }
    }

    progress
}

fn reduce_loop_block<X: Executor, E: Evaluator>(
    helper: &mut MinimizationHelper<X, E>,
    begin: usize,
    end: usize,
) -> bool {
    let mut body_break_continue = Vec::new();
    let mut loop_depth = 0i32;

    for i in (begin + 1)..end {
        let op = &helper.program().instructions[i].operation;
        match op {
            Operation::BeginWhileLoop
            | Operation::BeginDoWhileLoop
            | Operation::BeginForLoop
            | Operation::BeginRepeatLoop { .. } => loop_depth += 1,
            Operation::EndWhileLoop | Operation::EndDoWhileLoop | Operation::EndForLoop | Operation::EndRepeatLoop => {
                loop_depth -= 1;
            }
            Operation::Break | Operation::Continue if loop_depth == 0 => {
                body_break_continue.push(i);
            }
            _ => {}
        }
    }

    let mut indices = vec![begin, end];
    indices.extend(body_break_continue);
    helper.try_nopping(&indices)
}

fn reduce_try_catch_finally<X: Executor, E: Evaluator>(
    helper: &mut MinimizationHelper<X, E>,
    try_begin: usize,
    try_end: usize,
) -> bool {
    let mut cursor = try_end + 1;
    let mut catch_range = None;
    let mut finally_range = None;

    if matches!(
        helper.program().instructions.get(cursor).map(|i| &i.operation),
        Some(Operation::BeginCatch)
    ) {
        let catch_begin = cursor;
        let catch_end = code::find_matching_end(helper.program(), catch_begin);
        cursor = catch_end + 1;
        catch_range = Some((catch_begin, catch_end));
    }
    if matches!(
        helper.program().instructions.get(cursor).map(|i| &i.operation),
        Some(Operation::BeginFinally)
    ) {
        let finally_begin = cursor;
        let finally_end = code::find_matching_end(helper.program(), finally_begin);
        finally_range = Some((finally_begin, finally_end));
    }

    let mut markers = vec![try_begin, try_end];
    if let Some((cb, ce)) = catch_range {
        markers.push(cb);
        markers.push(ce);
    }
    if let Some((fb, fe)) = finally_range {
        markers.push(fb);
        markers.push(fe);
    }

    // Stage 1: drop only the block markers themselves.
    if helper.try_nopping(&markers) {
        return true;
    }

    // Stage 2: also drop the last surviving statement of the try body.
    if let Some(last) = (try_begin + 1..try_end)
        .rev()
        .find(|&i| !helper.program().instructions[i].is_nop())
    {
        let mut with_last = markers.clone();
        with_last.push(last);
        if helper.try_nopping(&with_last) {
            return true;
        }
    }

    // Stage 3: drop the whole try/catch/finally group.
    let last_end = finally_range.map_or_else(|| catch_range.map_or(try_end, |(_, ce)| ce), |(_, fe)| fe);
    let mut whole: Vec<usize> = (try_begin..=last_end).collect();
    whole.retain(|i| !helper.is_pinned(*i));
    helper.try_nopping(&whole)
}

fn reduce_code_string<X: Executor, E: Evaluator>(
    helper: &mut MinimizationHelper<X, E>,
    begin: usize,
    end: usize,
) -> bool {
    use novafuzz_ir::Instruction;

    let load_empty = Instruction::new(Operation::LoadString(String::new()), vec![]);
    let mut end_nop = helper.program().instructions[end].clone();
    end_nop.nop();
    if helper.try_replacements(vec![(begin, load_empty), (end, end_nop)]) {
        return true;
    }

    if helper.try_nopping(&[begin, end]) {
        return true;
    }

    let whole: Vec<usize> = (begin..=end).collect();
    helper.try_nopping(&whole)
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
    fn removes_an_empty_if_block() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadBoolean(true), vec![])).unwrap();
        b.append(Instruction::new(Operation::BeginIf, vec![0])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::EndIf, vec![])).unwrap();
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

        let progressed = reduce(&mut helper);
        assert!(progressed);
        let result = helper.into_program();
        assert!(result.is_statically_valid());
    }
}
