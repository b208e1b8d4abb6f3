use crate::operation::{Context, Operation};

/// A single IR instruction: an [`Operation`] together with the variable
/// indices it reads. Outputs are implicit — they are the `n` variables
/// immediately following this instruction's position in a [`Program`],
/// where `n = operation.num_outputs() + operation.num_inner_outputs()`.
///
/// [`Program`]: crate::Program
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Hash)]
pub struct Instruction {
    pub inputs: Vec<usize>,
    pub operation: Operation,
}

impl Instruction {
    pub fn new(operation: Operation, inputs: Vec<usize>) -> Self {
        assert_eq!(
            inputs.len(),
            operation.num_inputs(),
            "input arity mismatch for {operation}"
        );
        Self { inputs, operation }
    }

    pub fn num_outputs(&self) -> usize {
        self.operation.num_outputs()
    }

    pub fn num_inner_outputs(&self) -> usize {
        self.operation.num_inner_outputs()
    }

    pub fn is_block_begin(&self) -> bool {
        self.operation.is_block_begin()
    }

    pub fn is_block_end(&self) -> bool {
        self.operation.is_block_end()
    }

    pub fn is_noppable(&self) -> bool {
        self.operation.is_noppable()
    }

    /// If this instruction begins a block, the context entered by its body.
    pub fn entered_context_after_execution(&self) -> Option<Context> {
        self.operation.entered_context_after_execution()
    }

    /// Replace this instruction's operation with a `Nop` of matching output
    /// arity, dropping all inputs. Used by minimization reducers once an
    /// instruction has been shown to be unnecessary.
    pub fn nop(&mut self) {
        self.inputs.clear();
        self.operation = Operation::Nop {
            outputs: self.operation.num_outputs(),
            inner_outputs: self.operation.num_inner_outputs(),
        };
    }

    pub fn is_nop(&self) -> bool {
        matches!(self.operation, Operation::Nop { .. })
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <- {}", self.operation, self.inputs.len())
    }
}
