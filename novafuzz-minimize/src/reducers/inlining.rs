//! Inlines a function at its single call site and leaves the original
//! definition nopped in place, substituting parameters with the call's
//! argument variables (missing trailing arguments become `undefined`).
//! Deliberately narrow: more than one call site, recursive bodies, guarded
//! calls, or call sites preceding the definition are left alone for the
//! other reducers to chip away at instead.

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;
use novafuzz_ir::Instruction;

use crate::code;
use crate::helper::MinimizationHelper;

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let len = helper.program().instructions.len();

    for begin in 0..len {
        if helper.is_pinned(begin) {
            continue;
        }
        let Operation::BeginPlainFunction { parameters, .. } = helper.program().instructions[begin].operation else {
            continue;
        };
        let end = code::find_matching_end(helper.program(), begin);
        if helper.is_pinned(end) {
            continue;
        }

        let func_var = code::variables_defined_before(helper.program(), begin);

        let mut occurrences = Vec::new();
        let mut recursive = false;
        for (i, instr) in helper.program().instructions.iter().enumerate() {
            if instr.inputs.contains(&func_var) {
                if (begin..=end).contains(&i) {
                    recursive = true;
                }
                occurrences.push(i);
            }
        }
        if recursive || occurrences.len() != 1 {
            continue;
        }
        let call_idx = occurrences[0];
        if call_idx <= end {
            continue; // call site precedes (or is inside) the definition
        }
        let Operation::CallFunction { num_arguments, is_guarded } = helper.program().instructions[call_idx].operation else {
            continue;
        };
        if is_guarded {
            continue;
        }
        if helper.is_pinned(call_idx) {
            continue;
        }

        if try_inline_at(helper, begin, end, func_var, parameters, num_arguments, call_idx) {
            return true;
        }
    }

    false
}

#[allow(clippy::too_many_arguments)]
fn try_inline_at<X: Executor, E: Evaluator>(
    helper: &mut MinimizationHelper<X, E>,
    begin: usize,
    end: usize,
    func_var: usize,
    parameters: usize,
    num_arguments: usize,
    call_idx: usize,
) -> bool {
    let program = helper.program();
    let call_inputs = program.instructions[call_idx].inputs.clone();
    let arg_vars: Vec<usize> = call_inputs[1..].to_vec();

    let param_start = func_var + 1;
    let old_local_start = param_start + parameters;
    let old_local_count = code::variables_defined_before(program, end) - old_local_start;
    let new_local_start = code::variables_defined_before(program, call_idx);
    let missing = parameters.saturating_sub(num_arguments);
    let new_other_local_start = new_local_start + missing;

    let remap = |v: usize| -> usize {
        if v >= param_start && v < param_start + parameters {
            let i = v - param_start;
            match arg_vars.get(i) {
                Some(&arg) => arg,
                None => new_local_start + (i - num_arguments),
            }
        } else if v >= old_local_start && v < old_local_start + old_local_count {
            new_other_local_start + (v - old_local_start)
        } else {
            v
        }
    };

    let undef_instrs: Vec<Instruction> = (0..missing)
        .map(|_| Instruction::new(Operation::LoadUndefined, vec![]))
        .collect();

    // Top-level `Return`s (not nested in an inner block) don't have a valid
    // home once spliced outside of any function context; drop them and fold
    // their value into the trailing `Dup` below instead.
    let mut depth = 0i32;
    let mut return_value = None;
    let mut body_instrs = undef_instrs;
    for instr in &program.instructions[begin + 1..end] {
        if instr.is_block_begin() {
            depth += 1;
        }
        let is_top_level_return = depth == 0 && matches!(instr.operation, Operation::Return);
        if instr.is_block_end() {
            depth -= 1;
        }
        if is_top_level_return {
            return_value = Some(remap(instr.inputs[0]));
            continue;
        }
        body_instrs.push(Instruction::new(
            instr.operation.clone(),
            instr.inputs.iter().map(|&v| remap(v)).collect(),
        ));
    }
    let body_len = body_instrs.len();

    let mut candidate = program.clone();
    let total_shift = missing + old_local_count;
    if total_shift > 0 {
        code::shift_variable_references(&mut candidate, new_local_start, total_shift as i64, usize::MAX);
    }
    candidate.instructions.splice(call_idx..call_idx, body_instrs);

    let shifted_call_idx = call_idx + body_len;
    candidate.instructions[shifted_call_idx] = match return_value {
        Some(ret_var) => Instruction::new(Operation::Dup, vec![ret_var]),
        None => Instruction::new(Operation::LoadUndefined, vec![]),
    };

    for instr in &mut candidate.instructions[begin..=end] {
        instr.nop();
    }

    helper.test_and_commit(candidate)
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

    #[test]
    fn inlines_a_single_call_site() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(
            Operation::BeginPlainFunction {
                parameters: 0,
                name: None,
                is_strict: false,
            },
            vec![],
        ))
        .unwrap();
        b.append(Instruction::new(Operation::LoadInteger(7), vec![])).unwrap();
        b.append(Instruction::new(Operation::Return, vec![1])).unwrap();
        b.append(Instruction::new(Operation::EndPlainFunction, vec![])).unwrap();
        b.append(Instruction::new(Operation::CallFunction { num_arguments: 0, is_guarded: false }, vec![0]))
            .unwrap();
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
        assert!(helper.program().is_statically_valid());
    }

    #[test]
    fn substitutes_a_parameter_with_the_call_argument() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(
            Operation::BeginPlainFunction {
                parameters: 1,
                name: None,
                is_strict: false,
            },
            vec![],
        ))
        .unwrap();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::BinaryOperation(novafuzz_ir::operation::BinaryOperator::Add), vec![1, 2]))
            .unwrap();
        b.append(Instruction::new(Operation::Return, vec![3])).unwrap();
        b.append(Instruction::new(Operation::EndPlainFunction, vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(41), vec![])).unwrap();
        b.append(Instruction::new(Operation::CallFunction { num_arguments: 1, is_guarded: false }, vec![0, 4]))
            .unwrap();
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
        let result = helper.program();
        assert!(result.is_statically_valid());
        // the inlined Add should now read the call's argument variable (4)
        // rather than the function's own parameter slot.
        let add = result
            .instructions
            .iter()
            .find(|i| matches!(i.operation, Operation::BinaryOperation(_)))
            .unwrap();
        assert!(add.inputs.contains(&4));
    }

    #[test]
    fn missing_trailing_arguments_become_undefined() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(
            Operation::BeginPlainFunction {
                parameters: 1,
                name: None,
                is_strict: false,
            },
            vec![],
        ))
        .unwrap();
        b.append(Instruction::new(Operation::Return, vec![1])).unwrap();
        b.append(Instruction::new(Operation::EndPlainFunction, vec![])).unwrap();
        b.append(Instruction::new(Operation::CallFunction { num_arguments: 0, is_guarded: false }, vec![0]))
            .unwrap();
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
        assert!(helper.program().is_statically_valid());
    }
}
