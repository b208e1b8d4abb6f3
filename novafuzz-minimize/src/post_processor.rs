//! Runs once after the reducer fixpoint to patch up cosmetic properties a
//! heavily-reduced program tends to lose: functions without a `Return`,
//! calls left with no arguments, arrays left empty. None of these are
//! required for the tracked aspects to hold; each addition is proposed
//! through the same oracle as every reducer and dropped silently if it
//! doesn't survive.

use rand::seq::IteratorRandom;
use rand::RngCore;

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;
use novafuzz_ir::Instruction;

use crate::code;
use crate::helper::MinimizationHelper;

pub fn run<X: Executor, E: Evaluator, R: RngCore>(helper: &mut MinimizationHelper<X, E>, rng: &mut R) {
    add_missing_returns(helper, rng);
    add_call_arguments(helper, rng);
    fill_empty_arrays(helper, rng);
}

fn is_function_begin(op: &Operation) -> bool {
    matches!(
        op,
        Operation::BeginPlainFunction { .. }
            | Operation::BeginGeneratorFunction { .. }
            | Operation::BeginAsyncFunction { .. }
            | Operation::BeginArrowFunction { .. }
            | Operation::BeginAsyncGeneratorFunction { .. }
    )
}

fn add_missing_returns<X: Executor, E: Evaluator, R: RngCore>(helper: &mut MinimizationHelper<X, E>, rng: &mut R) {
    let mut begin = 0;
    while begin < helper.program().instructions.len() {
        let op = helper.program().instructions[begin].operation.clone();
        if !is_function_begin(&op) {
            begin += 1;
            continue;
        }
        let end = code::find_matching_end(helper.program(), begin);
        let mut depth = 0i32;
        let has_top_level_return = (begin + 1..end).any(|i| {
            let instr = &helper.program().instructions[i];
            if instr.is_block_begin() {
                depth += 1;
            }
            let is_return = depth == 0 && matches!(instr.operation, Operation::Return);
            if instr.is_block_end() {
                depth -= 1;
            }
            is_return
        });

        if !has_top_level_return && !helper.is_pinned(end) {
            let candidates = code::in_scope_variables_before(helper.program(), end);
            if let Some(&var) = candidates.iter().choose(rng) {
                helper.try_inserting(Instruction::new(Operation::Return, vec![var]), end);
            }
        }
        begin = end + 1;
    }
}

fn add_call_arguments<X: Executor, E: Evaluator, R: RngCore>(helper: &mut MinimizationHelper<X, E>, rng: &mut R) {
    let len = helper.program().instructions.len();
    for idx in 0..len {
        if helper.is_pinned(idx) {
            continue;
        }
        let op = helper.program().instructions[idx].operation.clone();
        let new_op = match &op {
            Operation::CallFunction { num_arguments: 0, is_guarded } => Some(Operation::CallFunction {
                num_arguments: 1,
                is_guarded: *is_guarded,
            }),
            Operation::CallMethod { name, num_arguments: 0, is_guarded } => Some(Operation::CallMethod {
                name: name.clone(),
                num_arguments: 1,
                is_guarded: *is_guarded,
            }),
            _ => None,
        };
        let Some(new_op) = new_op else { continue };

        let candidates = code::in_scope_variables_before(helper.program(), idx);
        let Some(&extra) = candidates.iter().choose(rng) else { continue };
        let mut inputs = helper.program().instructions[idx].inputs.clone();
        inputs.push(extra);
        helper.try_replacing(idx, Instruction::new(new_op, inputs));
    }
}

fn fill_empty_arrays<X: Executor, E: Evaluator, R: RngCore>(helper: &mut MinimizationHelper<X, E>, rng: &mut R) {
    let len = helper.program().instructions.len();
    for idx in 0..len {
        if helper.is_pinned(idx) {
            continue;
        }
        if !matches!(helper.program().instructions[idx].operation, Operation::CreateArray(0)) {
            continue;
        }
        let candidates = code::in_scope_variables_before(helper.program(), idx);
        let Some(&element) = candidates.iter().choose(rng) else { continue };
        helper.try_replacing(idx, Instruction::new(Operation::CreateArray(1), vec![element]));
    }
}
