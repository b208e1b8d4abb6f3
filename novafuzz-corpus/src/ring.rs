use rand::seq::SliceRandom;
use rand::RngCore;

use novafuzz_ir::aspects::ProgramAspects;
use novafuzz_ir::Program;

use crate::entry::{trivial_seed, CorpusEntry};

/// Tuning knobs for the ring-buffer scheduler.
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    pub min_size: usize,
    pub max_size: usize,
    pub min_mutations_per_sample: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 4096,
            min_mutations_per_sample: 3,
        }
    }
}

/// Uniform ring-buffer scheduler: entries are added in arrival order and
/// periodically swept (oldest-first) to evict samples that have been mutated
/// enough times, subject to never dropping below `min_size`.
#[derive(Debug, Default)]
pub struct BasicRing {
    pub config: RingConfig,
    entries: Vec<CorpusEntry>,
}

impl BasicRing {
    /// Seeds itself with one trivial program so the corpus is never empty;
    /// see [`trivial_seed`].
    pub fn new(config: RingConfig) -> Self {
        let mut ring = Self {
            config,
            entries: Vec::new(),
        };
        let (program, aspects) = trivial_seed();
        ring.add(program, aspects);
        ring
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    fn contains_hash(&self, hash: u32) -> bool {
        self.entries.iter().any(|e| e.hash == hash)
    }

    pub fn add(&mut self, program: Program, aspects: ProgramAspects) {
        if program.instructions.is_empty() {
            log::debug!("ignoring empty program");
            return;
        }
        let entry = CorpusEntry::new(program, aspects);
        if self.contains_hash(entry.hash) {
            log::debug!("ignoring duplicate program hash {:#010x}", entry.hash);
            return;
        }
        self.entries.push(entry);
        if self.entries.len() > self.config.max_size {
            self.entries.remove(0);
        }
    }

    pub fn random_for_mutation<R: RngCore>(&mut self, rng: &mut R) -> &Program {
        let idx = (0..self.entries.len())
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
            .expect("corpus must be non-empty");
        self.entries[idx].age += 1;
        &self.entries[idx].program
    }

    pub fn random_for_splicing<R: RngCore>(&mut self, rng: &mut R) -> &Program {
        self.random_for_mutation(rng)
    }

    /// Oldest-first eviction sweep. An entry old enough to be evicted
    /// (`age >= min_mutations_per_sample`) is only dropped while doing so
    /// would still leave the corpus with a strict margin above `min_size`,
    /// so a sweep that empties the eligible set exactly down to `min_size`
    /// stops one entry early rather than landing exactly on the floor.
    pub fn cleanup(&mut self) {
        let mut remaining = self.entries.len();
        let mut keep = Vec::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            let evictable = entry.age >= self.config.min_mutations_per_sample;
            if evictable && remaining > self.config.min_size + 1 {
                remaining -= 1;
                log::debug!(
                    "evicting entry with hash {:#010x} (age {})",
                    entry.hash,
                    entry.age
                );
                continue;
            }
            keep.push(entry);
        }

        self.entries = keep;
    }

    pub fn export_entries(&self) -> Vec<Program> {
        self.entries.iter().map(|e| e.program.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novafuzz_ir::aspects::OutcomeClass;
    use novafuzz_ir::{builder::ProgramBuilder, instruction::Instruction, operation::Operation};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn program(v: i64) -> Program {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(v), vec![]))
            .unwrap();
        b.finalize().unwrap()
    }

    fn aspects(edge: u32) -> ProgramAspects {
        ProgramAspects {
            edges: BTreeSet::from([edge]),
            outcome: OutcomeClass::Succeeded,
        }
    }

    #[test]
    fn ring_cleanup_keeps_young_entries_and_one_old_one() {
        let config = RingConfig {
            min_size: 2,
            max_size: 4,
            min_mutations_per_sample: 3,
        };
        let mut ring = BasicRing::new(config);
        ring.add(program(1), aspects(1)); // A
        ring.add(program(2), aspects(2)); // B
        ring.add(program(3), aspects(3)); // C
        ring.add(program(4), aspects(4)); // D

        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..3 {
            ring.entries[0].age += 1; // directly age A like 3 mutation draws would
        }
        for _ in 0..3 {
            ring.entries[1].age += 1; // age B
        }
        let _ = &mut rng;

        ring.cleanup();

        assert_eq!(ring.size(), 3);
        let hashes: Vec<_> = ring.entries().iter().map(|e| e.hash).collect();
        assert!(hashes.contains(&program(3).content_hash()));
        assert!(hashes.contains(&program(4).content_hash()));
    }

    #[test]
    fn duplicate_programs_are_not_added_twice() {
        let mut ring = BasicRing::new(RingConfig::default());
        let seeded_size = ring.size();
        ring.add(program(1), aspects(1));
        ring.add(program(1), aspects(1));
        assert_eq!(ring.size(), seeded_size + 1);
    }

    #[test]
    fn random_for_mutation_increments_age() {
        let mut ring = BasicRing::new(RingConfig::default());
        ring.add(program(1), aspects(1));
        let mut rng = SmallRng::seed_from_u64(7);
        let _ = ring.random_for_mutation(&mut rng);
        let total_age: u32 = ring.entries().iter().map(|e| e.age).sum();
        assert_eq!(total_age, 1);
    }

    #[test]
    fn new_corpus_is_never_empty() {
        let ring = BasicRing::new(RingConfig::default());
        assert!(!ring.is_empty());
    }
}
