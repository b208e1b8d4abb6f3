use std::collections::{HashMap, VecDeque};

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use novafuzz_ir::aspects::ProgramAspects;
use novafuzz_ir::Program;

use crate::entry::{trivial_seed, CorpusEntry};

/// Number of total executions below which the scheduler simply warms up the
/// edge-hit counters with uniformly random selections.
pub const BASELINE: u32 = 250;

/// Tuning knobs for the Markov edge-rarity scheduler.
#[derive(Debug, Clone, Copy)]
pub struct MarkovConfig {
    pub desired_proportion: f64,
    pub dropout_rate: f64,
    pub min_mutations_per_sample: u32,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            desired_proportion: 10.0,
            dropout_rate: 0.1,
            min_mutations_per_sample: 3,
        }
    }
}

/// Targets seeds that hit rare coverage edges. Before [`BASELINE`] total
/// executions it behaves like a uniform scheduler so the edge-hit counters
/// have enough signal to rank by rarity.
#[derive(Debug)]
pub struct MarkovEdgeRarity {
    pub config: MarkovConfig,
    entries: Vec<CorpusEntry>,
    edge_map: HashMap<u32, usize>,
    queue: VecDeque<usize>,
    current: Option<usize>,
    remaining_energy: u32,
    total_execs: u32,
}

impl MarkovEdgeRarity {
    /// Seeds itself with one trivial program so the corpus is never empty;
    /// see [`trivial_seed`].
    pub fn new(config: MarkovConfig) -> Self {
        let mut markov = Self {
            config,
            entries: Vec::new(),
            edge_map: HashMap::new(),
            queue: VecDeque::new(),
            current: None,
            remaining_energy: 0,
            total_execs: 0,
        };
        let (program, aspects) = trivial_seed();
        markov.add(program, aspects);
        markov
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

    pub fn total_execs(&self) -> u32 {
        self.total_execs
    }

    pub fn add(&mut self, program: Program, aspects: ProgramAspects) {
        if program.instructions.is_empty() {
            return;
        }
        let hash = program.content_hash();
        if self.entries.iter().any(|e| e.hash == hash) {
            return;
        }

        let index = self.entries.len();
        for &edge in &aspects.edges {
            self.edge_map.entry(edge).or_insert(index);
        }
        self.entries.push(CorpusEntry::new(program, aspects));
    }

    fn energy_base(&self) -> u32 {
        if self.total_execs == 0 {
            1
        } else {
            (self.total_execs as f64).log10().floor() as u32 + 1
        }
    }

    /// Rebuild `queue` from the rarest-hit edges, per §4.3's algorithm:
    /// pick the smallest non-zero hit count as the window start, take a
    /// window proportional to corpus size (at least 30 edges), and push
    /// each edge's discoverer with probability `1 - dropout_rate`.
    pub fn regenerate_queue<R: RngCore>(&mut self, rng: &mut R, edge_counts: &HashMap<u32, u32>) {
        let mut counts: Vec<(u32, u32)> = edge_counts
            .iter()
            .map(|(&edge, &count)| (edge, count))
            .collect();
        counts.sort_by_key(|&(_, count)| count);

        let Some(start_pos) = counts.iter().position(|&(_, count)| count > 0) else {
            log::debug!("no non-zero edge counts yet, queue stays empty");
            return;
        };

        let window = ((self.entries.len() as f64 / self.config.desired_proportion) as usize).max(30);
        let end = (start_pos + window).min(counts.len() - 1);
        let threshold = counts[end].1;

        for &(edge, count) in &counts[..=end] {
            if count == 0 || count > threshold {
                continue;
            }
            let Some(&owner) = self.edge_map.get(&edge) else {
                continue;
            };
            if rng.gen::<f64>() < 1.0 - self.config.dropout_rate || self.queue.is_empty() {
                self.queue.push_back(owner);
            }
        }

        log::debug!("regenerated Markov queue with {} entries", self.queue.len());
    }

    pub fn random_for_mutation<R: RngCore>(
        &mut self,
        rng: &mut R,
        edge_counts: &HashMap<u32, u32>,
    ) -> &Program {
        assert!(!self.entries.is_empty(), "corpus must be non-empty");
        self.total_execs += 1;

        let idx = if self.total_execs <= BASELINE {
            (0..self.entries.len())
                .collect::<Vec<_>>()
                .choose(rng)
                .copied()
                .expect("corpus is non-empty")
        } else {
            if self.queue.is_empty() && self.remaining_energy == 0 {
                self.regenerate_queue(rng, edge_counts);
            }
            if self.remaining_energy > 0 {
                self.remaining_energy -= 1;
                self.current.expect("energy only remains after a pop")
            } else {
                let next = self
                    .queue
                    .pop_front()
                    .or(self.current)
                    .unwrap_or(0);
                self.current = Some(next);
                self.remaining_energy = self.energy_base().saturating_sub(1);
                next
            }
        };

        self.entries[idx].age += 1;
        &self.entries[idx].program
    }

    pub fn random_for_splicing<R: RngCore>(
        &mut self,
        rng: &mut R,
        edge_counts: &HashMap<u32, u32>,
    ) -> &Program {
        self.random_for_mutation(rng, edge_counts)
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

    fn program(v: i64) -> Program {
        let mut b = ProgramBuilder::new();
        b.append(Instruction::new(Operation::LoadInteger(v), vec![]))
            .unwrap();
        b.finalize().unwrap()
    }

    fn aspects(edges: &[u32]) -> ProgramAspects {
        ProgramAspects {
            edges: edges.iter().copied().collect(),
            outcome: OutcomeClass::Succeeded,
        }
    }

    #[test]
    fn warm_up_period_returns_one_of_the_known_programs() {
        let mut markov = MarkovEdgeRarity::new(MarkovConfig::default());
        markov.add(program(1), aspects(&[1, 2]));
        let known_hashes: Vec<u32> = markov.entries().iter().map(|e| e.hash).collect();

        let mut rng = SmallRng::seed_from_u64(0);
        let edge_counts = HashMap::new();
        for _ in 0..BASELINE - 1 {
            let selected = markov.random_for_mutation(&mut rng, &edge_counts);
            assert!(known_hashes.contains(&selected.content_hash()));
        }
    }

    #[test]
    fn after_warm_up_queue_favors_rarest_edge_holder() {
        let mut markov = MarkovEdgeRarity::new(MarkovConfig::default());
        markov.add(program(1), aspects(&[1, 2]));
        markov.add(program(3), aspects(&[3]));
        let rarest_edge_owner = *markov.edge_map.get(&3).unwrap();

        let mut rng = SmallRng::seed_from_u64(0);
        markov.total_execs = BASELINE;

        let mut edge_counts = HashMap::new();
        edge_counts.insert(1, 50);
        edge_counts.insert(2, 50);
        edge_counts.insert(3, 1);

        markov.regenerate_queue(&mut rng, &edge_counts);
        assert!(markov.queue.contains(&rarest_edge_owner));
    }

    #[test]
    fn new_corpus_is_never_empty() {
        let markov = MarkovEdgeRarity::new(MarkovConfig::default());
        assert!(!markov.is_empty());
    }
}
