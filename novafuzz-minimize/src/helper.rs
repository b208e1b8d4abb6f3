use std::time::Duration;

use rand::RngCore;

use novafuzz_ir::aspects::{Evaluator, ProgramAspects};
use novafuzz_ir::executor::Executor;
use novafuzz_ir::{Instruction, Program};

use crate::keep_alive::KeepAliveSet;

/// Tuning knobs for a single minimization run.
#[derive(Debug, Clone, Copy)]
pub struct MinimizerConfig {
    /// Fraction of the program pinned (plus its data-flow predecessors)
    /// before minimization starts, trading thoroughness for speed on large
    /// programs. `0.0` pins nothing.
    pub minimization_limit: f64,
    /// How many times each candidate is re-executed before being accepted,
    /// guarding against flaky aspect detection.
    pub num_test_executions: u32,
    /// Reducer fixpoint iteration cap.
    pub max_iterations: u32,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            minimization_limit: 0.0,
            num_test_executions: 3,
            max_iterations: 100,
        }
    }
}

/// Shared state and primitives every reducer proposes candidates through.
/// Holds the current best-known-minimal program; a reducer never mutates it
/// directly, only by handing a whole candidate [`Program`] to
/// [`test_and_commit`](Self::test_and_commit).
pub struct MinimizationHelper<'a, X: Executor, E: Evaluator> {
    code: Program,
    aspects: ProgramAspects,
    executor: &'a mut X,
    evaluator: &'a E,
    keep_alive: KeepAliveSet,
    config: MinimizerConfig,
    did_reduce: bool,
}

impl<'a, X: Executor, E: Evaluator> MinimizationHelper<'a, X, E> {
    pub fn new<R: RngCore>(
        program: Program,
        aspects: ProgramAspects,
        executor: &'a mut X,
        evaluator: &'a E,
        config: MinimizerConfig,
        rng: &mut R,
    ) -> Self {
        let keep_alive = KeepAliveSet::compute(&program, config.minimization_limit, rng);
        Self {
            code: program,
            aspects,
            executor,
            evaluator,
            keep_alive,
            config,
            did_reduce: false,
        }
    }

    pub fn program(&self) -> &Program {
        &self.code
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.keep_alive.is_pinned(index)
    }

    pub fn keep_alive_is_empty(&self) -> bool {
        self.keep_alive.is_empty()
    }

    pub fn did_reduce(&self) -> bool {
        self.did_reduce
    }

    pub fn reset_did_reduce(&mut self) {
        self.did_reduce = false;
    }

    fn preserves_aspects(&mut self, candidate: &Program) -> bool {
        for _ in 0..self.config.num_test_executions.max(1) {
            let execution = self.executor.execute(candidate, Duration::from_secs(5));
            if !self.evaluator.has_aspects(&execution, &self.aspects) {
                return false;
            }
        }
        true
    }

    /// Accept `candidate` as the new current program if it is statically
    /// valid and still exhibits every aspect the original program did.
    /// Leaves `self` untouched on rejection.
    pub fn test_and_commit(&mut self, candidate: Program) -> bool {
        if !candidate.is_statically_valid() {
            log::debug!("rejected candidate: fails static validity");
            return false;
        }
        if !self.preserves_aspects(&candidate) {
            log::debug!("rejected candidate: lost tracked aspects");
            return false;
        }
        log::debug!(
            "committed candidate: {} -> {} instructions",
            self.code.instructions.len(),
            candidate.instructions.len()
        );
        self.code = candidate;
        self.did_reduce = true;
        true
    }

    /// Replace a single instruction, preserving its output/inner-output
    /// arity so the rest of the program's variable numbering stays valid.
    pub fn try_replacing(&mut self, at: usize, with: Instruction) -> bool {
        if self.is_pinned(at) {
            return false;
        }
        let current = &self.code.instructions[at];
        if with.num_outputs() != current.num_outputs() || with.num_inner_outputs() != current.num_inner_outputs() {
            return false;
        }
        let mut candidate = self.code.clone();
        candidate.instructions[at] = with;
        self.test_and_commit(candidate)
    }

    /// Replace several instructions atomically: either all apply and the
    /// result passes, or none do.
    pub fn try_replacements(&mut self, replacements: Vec<(usize, Instruction)>) -> bool {
        if replacements.iter().any(|(idx, _)| self.is_pinned(*idx)) {
            return false;
        }
        let mut candidate = self.code.clone();
        for (idx, instr) in replacements {
            let current = &candidate.instructions[idx];
            if instr.num_outputs() != current.num_outputs() || instr.num_inner_outputs() != current.num_inner_outputs() {
                return false;
            }
            candidate.instructions[idx] = instr;
        }
        self.test_and_commit(candidate)
    }

    /// Nop every index in `indices` atomically.
    pub fn try_nopping(&mut self, indices: &[usize]) -> bool {
        if indices.is_empty() {
            return false;
        }
        if indices
            .iter()
            .any(|&idx| self.is_pinned(idx) || !self.code.instructions[idx].is_noppable() || self.code.instructions[idx].is_nop())
        {
            return false;
        }
        let mut candidate = self.code.clone();
        for &idx in indices {
            candidate.instructions[idx].nop();
        }
        self.test_and_commit(candidate)
    }

    /// Insert a brand new instruction at `at`. Only safe while nothing is
    /// pinned, since inserting shifts every later variable index and the
    /// keep-alive set is computed against the original numbering.
    pub fn try_inserting(&mut self, instruction: Instruction, at: usize) -> bool {
        if !self.keep_alive_is_empty() {
            return false;
        }
        let mut candidate = self.code.clone();
        crate::code::insert(&mut candidate, at, instruction);
        self.test_and_commit(candidate)
    }

    /// Finish minimization: strip whatever nops accumulated along the way.
    pub fn into_program(mut self) -> Program {
        self.code.remove_nops();
        self.code
    }
}
