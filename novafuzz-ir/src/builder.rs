use std::collections::HashSet;

use rand::seq::IteratorRandom;
use rand::RngCore;

use crate::errors::ProgramValidationError;
use crate::instruction::Instruction;
use crate::operation::{Context, Operation};
use crate::Program;

struct Scope {
    begin: Option<usize>,
    id: usize,
    context: Context,
}

/// A variable together with the id of the scope it was defined in.
struct ScopedVariable {
    scope_id: usize,
}

/// Incrementally builds a [`Program`], tracking block scopes and rejecting
/// instructions that reference undefined or out-of-scope variables.
///
/// Unlike a typed IR builder this performs no value-type checking (see
/// `Non-goals`): only arity, scope-membership and block-matching are
/// enforced.
pub struct ProgramBuilder {
    active_scopes: Vec<Scope>,
    active_scopes_set: HashSet<usize>,
    scope_counter: usize,

    variables: Vec<ScopedVariable>,
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            active_scopes: Vec::new(),
            active_scopes_set: HashSet::new(),
            scope_counter: 0,
            variables: Vec::with_capacity(256),
            instructions: Vec::with_capacity(256),
        };
        builder.enter_scope(None, Context::Global);
        builder
    }

    pub fn from_program(program: &Program) -> Result<Self, ProgramValidationError> {
        let mut builder = Self::new();
        builder.append_all(program.instructions.iter().cloned())?;
        Ok(builder)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    fn is_scope_active(&self, scope_id: usize) -> bool {
        self.active_scopes_set.contains(&scope_id)
    }

    pub fn is_variable_in_scope(&self, variable_index: usize) -> bool {
        self.variables
            .get(variable_index)
            .is_some_and(|v| self.is_scope_active(v.scope_id))
    }

    fn enter_scope(&mut self, begin: Option<usize>, context: Context) {
        self.scope_counter += 1;
        self.active_scopes.push(Scope {
            begin,
            id: self.scope_counter,
            context,
        });
        self.active_scopes_set.insert(self.scope_counter);
    }

    fn exit_scope(&mut self) -> Scope {
        let exited = self
            .active_scopes
            .pop()
            .expect("there must always be an active scope");
        assert!(self.active_scopes_set.remove(&exited.id));
        exited
    }

    fn current_scope(&self) -> &Scope {
        self.active_scopes
            .last()
            .expect("there must always be an active scope")
    }

    pub fn current_context(&self) -> Context {
        self.current_scope().context
    }

    /// Append a single instruction, validating arity, variable scope and
    /// block matching.
    pub fn append(&mut self, instruction: Instruction) -> Result<(), ProgramValidationError> {
        if instruction.operation.num_inputs() != instruction.inputs.len() {
            return Err(ProgramValidationError::InvalidNumberOfInputs {
                is: instruction.inputs.len(),
                expected: instruction.operation.num_inputs(),
            });
        }

        for input_idx in &instruction.inputs {
            if !self.is_variable_in_scope(*input_idx) {
                return Err(ProgramValidationError::VariableNotDefined(*input_idx));
            }
        }

        if instruction.operation.is_block_end() {
            let exited = self.exit_scope();
            let begin_idx = exited.begin.expect("block scope always records its begin");
            if !instruction
                .operation
                .is_matching_block_begin(&self.instructions[begin_idx].operation)
            {
                return Err(ProgramValidationError::InvalidBlockEnd {
                    begin: self.instructions[begin_idx].operation.clone(),
                    end: instruction.operation.clone(),
                });
            }
        }

        let scope_id = match instruction.operation {
            Operation::Nop { .. } => 0,
            _ => self.current_scope().id,
        };
        for _ in 0..instruction.num_outputs() {
            self.variables.push(ScopedVariable { scope_id });
        }

        if instruction.operation.is_block_begin() {
            self.enter_scope(
                Some(self.instructions.len()),
                instruction
                    .entered_context_after_execution()
                    .expect("block begin always enters a context"),
            );
        }

        let inner_scope_id = match instruction.operation {
            Operation::Nop { .. } => 0,
            _ => self.scope_counter,
        };
        for _ in 0..instruction.num_inner_outputs() {
            self.variables.push(ScopedVariable {
                scope_id: inner_scope_id,
            });
        }

        self.instructions.push(instruction);
        Ok(())
    }

    pub fn append_all(
        &mut self,
        instructions: impl Iterator<Item = Instruction>,
    ) -> Result<(), ProgramValidationError> {
        for instruction in instructions {
            self.append(instruction)?;
        }
        Ok(())
    }

    /// Finish building, returning the completed program. Fails if any block
    /// scope is still open.
    pub fn finalize(self) -> Result<Program, ProgramValidationError> {
        if self.active_scopes.len() != 1 {
            return Err(ProgramValidationError::ScopeStillOpen);
        }
        if self.instructions.is_empty() {
            return Err(ProgramValidationError::EmptyProgram);
        }
        Ok(Program::unchecked_new(self.instructions))
    }

    /// A random in-scope variable index, if any exist.
    pub fn random_variable<R: RngCore>(&self, rng: &mut R) -> Option<usize> {
        (0..self.variables.len())
            .filter(|idx| self.is_variable_in_scope(*idx))
            .choose(rng)
    }

    /// All currently in-scope variable indices.
    pub fn in_scope_variables(&self) -> Vec<usize> {
        (0..self.variables.len())
            .filter(|idx| self.is_variable_in_scope(*idx))
            .collect()
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
