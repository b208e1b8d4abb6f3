use novafuzz_ir::builder::ProgramBuilder;
use novafuzz_ir::{Instruction, Program};

/// Number of variables defined strictly before `instruction_index`.
pub fn variables_defined_before(program: &Program, instruction_index: usize) -> usize {
    program.instructions[..instruction_index]
        .iter()
        .map(|i| i.num_outputs() + i.num_inner_outputs())
        .sum()
}

/// Shift every input reference `>= boundary` by `shift` (positive or
/// negative), skipping `skip_index` (pass `usize::MAX` to skip nothing).
/// Mirrors the renumbering `Program::remove_nops` performs when it
/// collapses the other direction.
pub fn shift_variable_references(program: &mut Program, boundary: usize, shift: i64, skip_index: usize) {
    if shift == 0 {
        return;
    }
    for (i, instr) in program.instructions.iter_mut().enumerate() {
        if i == skip_index {
            continue;
        }
        for input in &mut instr.inputs {
            if *input >= boundary {
                *input = (*input as i64 + shift) as usize;
            }
        }
    }
}

/// Insert `instruction` at position `at`, shifting subsequent variable
/// references to make room for its outputs.
pub fn insert(program: &mut Program, at: usize, instruction: Instruction) {
    let boundary = variables_defined_before(program, at);
    let shift = (instruction.num_outputs() + instruction.num_inner_outputs()) as i64;
    shift_variable_references(program, boundary, shift, usize::MAX);
    program.instructions.insert(at, instruction);
}

/// Every matched `(begin, end)` block pair in the program, at any nesting
/// depth, ordered by `begin` ascending.
pub fn all_block_pairs(program: &Program) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for (i, instr) in program.instructions.iter().enumerate() {
        if instr.is_block_begin() {
            stack.push(i);
        }
        if instr.is_block_end() {
            let begin = stack.pop().expect("block end always has a matching begin");
            pairs.push((begin, i));
        }
    }

    pairs
}

/// The instruction index closing the block opened at `begin`.
pub fn find_matching_end(program: &Program, begin: usize) -> usize {
    let mut depth = 0;
    for i in begin..program.instructions.len() {
        if program.instructions[i].is_block_begin() {
            depth += 1;
        }
        if program.instructions[i].is_block_end() {
            depth -= 1;
            if depth == 0 {
                return i;
            }
        }
    }
    unreachable!("block begin always has a matching end")
}

/// Variable indices in scope immediately before `position`, replaying the
/// program through a fresh builder. Returns an empty list if the prefix
/// itself is not statically valid (callers only use this on already-valid
/// programs).
pub fn in_scope_variables_before(program: &Program, position: usize) -> Vec<usize> {
    let mut builder = ProgramBuilder::new();
    for instr in &program.instructions[..position] {
        if builder.append(instr.clone()).is_err() {
            return Vec::new();
        }
    }
    builder.in_scope_variables()
}
