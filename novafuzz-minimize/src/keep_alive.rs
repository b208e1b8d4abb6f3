use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::RngCore;

use novafuzz_ir::Program;

/// Instructions the minimizer must never remove or replace: a random
/// fraction of the program (sized by `minimization_limit`) plus the
/// transitive data-flow predecessors of whatever that fraction touches, so a
/// pinned use never outlives the definition it depends on.
#[derive(Debug, Default)]
pub struct KeepAliveSet {
    pinned: HashSet<usize>,
}

impl KeepAliveSet {
    pub fn compute<R: RngCore>(program: &Program, minimization_limit: f64, rng: &mut R) -> Self {
        let len = program.instructions.len();
        if len == 0 || minimization_limit <= 0.0 {
            return Self { pinned: HashSet::new() };
        }

        let mut definer: HashMap<usize, usize> = HashMap::new();
        let mut next_var = 0usize;
        for (i, instr) in program.instructions.iter().enumerate() {
            for _ in 0..(instr.num_outputs() + instr.num_inner_outputs()) {
                definer.insert(next_var, i);
                next_var += 1;
            }
        }

        let initial_count = ((len as f64) * minimization_limit.min(1.0)).round() as usize;
        let mut all: Vec<usize> = (0..len).collect();
        all.shuffle(rng);
        let mut pinned: HashSet<usize> = all.into_iter().take(initial_count).collect();

        let mut stack: Vec<usize> = pinned.iter().copied().collect();
        while let Some(idx) = stack.pop() {
            for input in &program.instructions[idx].inputs {
                if let Some(&def_idx) = definer.get(input) {
                    if pinned.insert(def_idx) {
                        stack.push(def_idx);
                    }
                }
            }
        }

        Self { pinned }
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.pinned.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::builder::ProgramBuilder;
    use novafuzz_ir::instruction::Instruction;
    use novafuzz_ir::operation::{BinaryOperator, Operation};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn zero_limit_pins_nothing() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        let program = b.finalize().unwrap();

        let mut rng = SmallRng::seed_from_u64(0);
        let set = KeepAliveSet::compute(&program, 0.0, &mut rng);
        assert!(set.is_empty());
    }

    #[test]
    fn pinning_a_use_also_pins_its_definition() {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(1), vec![])).unwrap();
        b.append(Instruction::new(Operation::LoadInteger(2), vec![])).unwrap();
        b.append(Instruction::new(
            Operation::BinaryOperation(BinaryOperator::Add),
            vec![0, 1],
        ))
        .unwrap();
        let program = b.finalize().unwrap();

        let mut rng = SmallRng::seed_from_u64(1);
        let set = KeepAliveSet::compute(&program, 1.0, &mut rng);
        assert!(set.is_pinned(0));
        assert!(set.is_pinned(1));
        assert!(set.is_pinned(2));
    }
}
