use rand::Rng;
use rand::RngCore;

use novafuzz_ir::aspects::ProgramAspects;
use novafuzz_ir::Program;

use crate::entry::{trivial_seed, CorpusEntry};

/// Tuning knobs for the multi-armed-bandit scheduler.
#[derive(Debug, Clone, Copy)]
pub struct MabConfig {
    /// Exploration parameter: fraction of selections drawn uniformly at
    /// random rather than weighted.
    pub gamma: f64,
    pub max_cache_size: usize,
    /// Number of selections between crit-mass checks.
    pub crit_mass_threshold: u32,
    /// Selections since the cache was last rebuilt before it is considered
    /// flatlined and rebuilt from the full arm list.
    pub regenerate_threshold: u32,
    /// Selections since the last rewarded arm before the cache is cleared
    /// and reseeded.
    pub restart_threshold: u32,
    pub min_mutations_per_sample: u32,
}

impl Default for MabConfig {
    fn default() -> Self {
        Self {
            gamma: 0.1,
            max_cache_size: 64,
            crit_mass_threshold: 500,
            regenerate_threshold: 1000,
            restart_threshold: 2000,
            min_mutations_per_sample: 3,
        }
    }
}

/// EXP3-style multi-armed bandit: every corpus entry is an arm, weighted by
/// an estimate of its inverse-selection-probability reward. Failures never
/// increase an arm's weight (the corrected behavior; see the Design Notes).
#[derive(Debug)]
pub struct MultiArmedBandit {
    pub config: MabConfig,
    entries: Vec<CorpusEntry>,
    weights: Vec<f64>,
    cache: Vec<usize>,
    trials: u32,
    epoch: u32,
    epoch_reward: f64,
    epoch_bound: f64,
    selections_since_reward: u32,
    last_selected: Option<usize>,
}

impl MultiArmedBandit {
    /// Seeds itself with one trivial program so the corpus is never empty;
    /// see [`trivial_seed`].
    pub fn new(config: MabConfig) -> Self {
        let mut bandit = Self {
            config,
            entries: Vec::new(),
            weights: Vec::new(),
            cache: Vec::new(),
            trials: 0,
            epoch: 0,
            epoch_reward: 0.0,
            epoch_bound: 1.0,
            selections_since_reward: 0,
            last_selected: None,
        };
        let (program, aspects) = trivial_seed();
        bandit.add(program, aspects);
        bandit
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
            return;
        }
        let entry = CorpusEntry::new(program, aspects);
        if self.contains_hash(entry.hash) {
            return;
        }
        self.entries.push(entry);
        self.weights.push(1.0);
        if self.cache.len() < self.config.max_cache_size {
            self.cache.push(self.entries.len() - 1);
        }
    }

    fn rebuild_cache(&mut self) {
        let mut ranked: Vec<usize> = (0..self.entries.len()).collect();
        ranked.sort_by(|&a, &b| self.weights[b].partial_cmp(&self.weights[a]).unwrap());
        ranked.truncate(self.config.max_cache_size);
        self.cache = ranked;
        log::debug!("rebuilt MAB cache with {} arms", self.cache.len());
    }

    /// Select an arm index into the corpus's own entry vector, incrementing
    /// its age. Exploration draws uniformly from the full arm list;
    /// exploitation draws from `cache` proportional to weight.
    pub fn random_for_mutation<R: RngCore>(&mut self, rng: &mut R) -> &Program {
        assert!(!self.entries.is_empty(), "corpus must be non-empty");

        if self.cache.is_empty() {
            self.rebuild_cache();
        }

        let idx = if rng.gen::<f64>() < self.config.gamma {
            rng.gen_range(0..self.entries.len())
        } else {
            let total: f64 = self.cache.iter().map(|&i| self.weights[i]).sum();
            let mut pick = rng.gen::<f64>() * total;
            let mut chosen = *self.cache.last().expect("cache is non-empty here");
            for &i in &self.cache {
                pick -= self.weights[i];
                if pick <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };

        self.trials += 1;
        self.last_selected = Some(idx);
        self.entries[idx].age += 1;

        if self.config.crit_mass_threshold != 0 && self.trials % self.config.crit_mass_threshold == 0 {
            self.check_crit_mass();
        }
        if self.selections_since_reward >= self.config.restart_threshold {
            log::debug!("MAB restart: clearing cache after a reward drought");
            self.cache.clear();
            self.selections_since_reward = 0;
        }

        &self.entries[idx].program
    }

    pub fn random_for_splicing<R: RngCore>(&mut self, rng: &mut R) -> &Program {
        self.random_for_mutation(rng)
    }

    fn check_crit_mass(&mut self) {
        if self.epoch_reward > self.epoch_bound {
            self.epoch += 1;
            self.epoch_bound = self.epoch_bound * 2.0 + 1.0;
            self.epoch_reward = 0.0;
            log::debug!("MAB opened epoch {}", self.epoch);
        } else {
            let max_weight = self.weights.iter().cloned().fold(0.0_f64, f64::max);
            if max_weight > 0.0 {
                for w in &mut self.weights {
                    *w /= max_weight;
                }
            }
        }
        if self.config.regenerate_threshold != 0 && self.trials % self.config.regenerate_threshold == 0
        {
            self.rebuild_cache();
        }
    }

    /// EXP3 reward update for the most recently selected arm. A failed
    /// selection leaves weights untouched.
    pub fn reward(&mut self, success: bool) {
        let Some(idx) = self.last_selected else {
            return;
        };
        if !success {
            self.selections_since_reward += 1;
            return;
        }

        let k = self.entries.len().max(1) as f64;
        let prob = 1.0 / k;
        let estimate = 1.0 / prob;
        self.weights[idx] *= ((self.config.gamma * estimate) / k).exp();
        self.epoch_reward += estimate;
        self.selections_since_reward = 0;
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
    fn failure_never_increases_weight() {
        let mut mab = MultiArmedBandit::new(MabConfig::default());
        mab.add(program(1), aspects(1));
        let mut rng = SmallRng::seed_from_u64(3);
        let _ = mab.random_for_mutation(&mut rng);
        let before = mab.weights[0];
        mab.reward(false);
        assert_eq!(mab.weights[0], before);
    }

    #[test]
    fn success_increases_weight() {
        let mut mab = MultiArmedBandit::new(MabConfig::default());
        mab.add(program(1), aspects(1));
        let mut rng = SmallRng::seed_from_u64(3);
        let _ = mab.random_for_mutation(&mut rng);
        let idx = mab.last_selected.unwrap();
        let before = mab.weights[idx];
        mab.reward(true);
        assert!(mab.weights[idx] > before);
    }

    #[test]
    fn random_for_mutation_never_panics_on_a_freshly_seeded_corpus() {
        let mut mab = MultiArmedBandit::new(MabConfig::default());
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..10 {
            let _ = mab.random_for_mutation(&mut rng);
        }
    }

    #[test]
    fn new_corpus_is_never_empty() {
        let mab = MultiArmedBandit::new(MabConfig::default());
        assert!(!mab.is_empty());
    }
}
