//! Structural simplifications that don't change instruction count: collapse
//! the fancier function kinds down to plain functions, drop spreads/strict
//! flags/guards/names where possible, and expand destructuring patterns into
//! their constituent property/element accesses.

use novafuzz_ir::aspects::Evaluator;
use novafuzz_ir::executor::Executor;
use novafuzz_ir::operation::Operation;
use novafuzz_ir::Instruction;

use crate::code;
use crate::helper::MinimizationHelper;

pub fn reduce<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    progress |= simplify_function_kinds(helper);
    progress |= simplify_single_instructions(helper);
    progress |= simplify_destructuring(helper);
    progress
}

fn simplify_function_kinds<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    let len = helper.program().instructions.len();

    for begin in 0..len {
        if helper.is_pinned(begin) {
            continue;
        }
        let op = helper.program().instructions[begin].operation.clone();
        let new_begin_op = match &op {
            Operation::BeginGeneratorFunction {
                parameters,
                name,
                is_strict,
            }
            | Operation::BeginAsyncFunction {
                parameters,
                name,
                is_strict,
            }
            | Operation::BeginAsyncGeneratorFunction {
                parameters,
                name,
                is_strict,
            } => Some(Operation::BeginPlainFunction {
                parameters: *parameters,
                name: name.clone(),
                is_strict: *is_strict,
            }),
            Operation::BeginArrowFunction { parameters, is_strict } => Some(Operation::BeginPlainFunction {
                parameters: *parameters,
                name: None,
                is_strict: *is_strict,
            }),
            _ => None,
        };
        let Some(new_begin_op) = new_begin_op else { continue };

        let end = code::find_matching_end(helper.program(), begin);
        if helper.is_pinned(end) {
            continue;
        }

        let new_begin = Instruction::new(new_begin_op, helper.program().instructions[begin].inputs.clone());
        let new_end = Instruction::new(Operation::EndPlainFunction, vec![]);
        if helper.try_replacements(vec![(begin, new_begin), (end, new_end)]) {
            progress = true;
        }
    }

    progress
}

fn simplify_single_instructions<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let mut progress = false;
    let len = helper.program().instructions.len();

    for idx in 0..len {
        if helper.is_pinned(idx) {
            continue;
        }
        let op = helper.program().instructions[idx].operation.clone();
        let inputs = helper.program().instructions[idx].inputs.clone();

        let replacement = match &op {
            Operation::CreateArrayWithSpread(spreads) => Some(Operation::CreateArray(spreads.len())),
            Operation::CallFunctionWithSpread { spreads, .. } => Some(Operation::CallFunction {
                num_arguments: spreads.len(),
                is_guarded: false,
            }),
            Operation::CallMethodWithSpread { name, spreads, .. } => Some(Operation::CallMethod {
                name: name.clone(),
                num_arguments: spreads.len(),
                is_guarded: false,
            }),
            Operation::ConstructWithSpread { spreads } => Some(Operation::Construct {
                num_arguments: spreads.len(),
            }),
            Operation::Construct { num_arguments } => Some(Operation::CallFunction {
                num_arguments: *num_arguments,
                is_guarded: false,
            }),
            Operation::BeginPlainFunction {
                parameters,
                name,
                is_strict,
            } if *is_strict || name.is_some() => Some(Operation::BeginPlainFunction {
                parameters: *parameters,
                name: None,
                is_strict: false,
            }),
            _ if op.is_guardable() => {
                let unguarded = op.unguarded();
                if unguarded == op {
                    None
                } else {
                    Some(unguarded)
                }
            }
            _ => None,
        };

        let Some(replacement) = replacement else { continue };
        if replacement.num_inputs() != inputs.len() {
            continue;
        }
        let new_instr = Instruction::new(replacement, inputs);
        if helper.try_replacing(idx, new_instr) {
            progress = true;
        }
    }

    progress
}

fn simplify_destructuring<X: Executor, E: Evaluator>(helper: &mut MinimizationHelper<X, E>) -> bool {
    let len = helper.program().instructions.len();

    for idx in 0..len {
        if helper.is_pinned(idx) {
            continue;
        }
        let instr = helper.program().instructions[idx].clone();

        let expanded: Option<Vec<Instruction>> = match &instr.operation {
            Operation::DestructObject {
                properties,
                has_rest_element,
            } if properties.len() + usize::from(*has_rest_element) > 1 => {
                let mut expanded: Vec<Instruction> = properties
                    .iter()
                    .map(|name| {
                        Instruction::new(
                            Operation::GetProperty {
                                name: name.clone(),
                                is_guarded: false,
                            },
                            instr.inputs.clone(),
                        )
                    })
                    .collect();
                if *has_rest_element {
                    expanded.push(Instruction::new(
                        Operation::DestructObject {
                            properties: Vec::new(),
                            has_rest_element: true,
                        },
                        instr.inputs.clone(),
                    ));
                }
                Some(expanded)
            }
            Operation::DestructArray {
                indices,
                has_rest_element,
            } if indices.len() + usize::from(*has_rest_element) > 1 => {
                let mut expanded: Vec<Instruction> = indices
                    .iter()
                    .map(|&i| {
                        Instruction::new(
                            Operation::GetElement {
                                index: i64::from(i),
                                is_guarded: false,
                            },
                            instr.inputs.clone(),
                        )
                    })
                    .collect();
                if *has_rest_element {
                    expanded.push(Instruction::new(
                        Operation::DestructArray {
                            indices: Vec::new(),
                            has_rest_element: true,
                        },
                        instr.inputs.clone(),
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        let Some(expanded) = expanded else { continue };

        let mut candidate = helper.program().clone();
        candidate.instructions.splice(idx..=idx, expanded);
        if helper.test_and_commit(candidate) {
            // Indices shifted; the next fixpoint iteration re-scans.
            return true;
        }
    }

    false
}
