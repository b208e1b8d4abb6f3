pub mod entry;
pub mod errors;
pub mod mab;
pub mod markov;
pub mod ring;

use std::collections::HashMap;

use rand::RngCore;

use novafuzz_ir::aspects::ProgramAspects;
use novafuzz_ir::snapshot::{decode_programs, encode_programs};
use novafuzz_ir::Program;

pub use entry::CorpusEntry;
pub use errors::CorpusError;
pub use mab::{MabConfig, MultiArmedBandit};
pub use markov::{MarkovConfig, MarkovEdgeRarity};
pub use ring::{BasicRing, RingConfig};

/// The three scheduling strategies, dispatched by a single sum type rather
/// than a trait object, since the set of strategies is closed and each has a
/// meaningfully different selection signature (the Markov strategy needs
/// edge counts the other two don't).
pub enum CorpusImpl {
    Ring(BasicRing),
    Mab(MultiArmedBandit),
    Markov(MarkovEdgeRarity),
}

impl CorpusImpl {
    pub fn ring(config: RingConfig) -> Self {
        Self::Ring(BasicRing::new(config))
    }

    pub fn mab(config: MabConfig) -> Self {
        Self::Mab(MultiArmedBandit::new(config))
    }

    pub fn markov(config: MarkovConfig) -> Self {
        Self::Markov(MarkovEdgeRarity::new(config))
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Ring(r) => r.size(),
            Self::Mab(m) => m.size(),
            Self::Markov(m) => m.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn add(&mut self, program: Program, aspects: ProgramAspects) {
        match self {
            Self::Ring(r) => r.add(program, aspects),
            Self::Mab(m) => m.add(program, aspects),
            Self::Markov(m) => m.add(program, aspects),
        }
    }

    /// Select a program for mutation. The Markov strategy needs per-edge hit
    /// counts to rank rarity; callers not using it may pass an empty map.
    pub fn random_for_mutation<R: RngCore>(
        &mut self,
        rng: &mut R,
        edge_counts: &HashMap<u32, u32>,
    ) -> &Program {
        match self {
            Self::Ring(r) => r.random_for_mutation(rng),
            Self::Mab(m) => m.random_for_mutation(rng),
            Self::Markov(m) => m.random_for_mutation(rng, edge_counts),
        }
    }

    pub fn random_for_splicing<R: RngCore>(
        &mut self,
        rng: &mut R,
        edge_counts: &HashMap<u32, u32>,
    ) -> &Program {
        match self {
            Self::Ring(r) => r.random_for_splicing(rng),
            Self::Mab(m) => m.random_for_splicing(rng),
            Self::Markov(m) => m.random_for_splicing(rng, edge_counts),
        }
    }

    /// Periodic maintenance; only the ring strategy currently does anything
    /// here, so the other variants are no-ops.
    pub fn cleanup(&mut self) {
        if let Self::Ring(r) = self {
            r.cleanup();
        }
    }

    pub fn reward(&mut self, success: bool) {
        if let Self::Mab(m) = self {
            m.reward(success);
        }
    }

    fn export_entries(&self) -> Vec<Program> {
        match self {
            Self::Ring(r) => r.export_entries(),
            Self::Mab(m) => m.export_entries(),
            Self::Markov(m) => m.export_entries(),
        }
    }

    pub fn export_state(&self) -> Result<Vec<u8>, CorpusError> {
        let programs = self.export_entries();
        encode_programs(&programs).map_err(CorpusError::Encode)
    }

    /// Reimport a snapshot produced by [`export_state`], reusing each
    /// program's own last-known aspects as its initial aspects: snapshots
    /// carry no coverage metadata of their own, so anything resumed this way
    /// starts with empty edge sets and a `Succeeded` outcome until the next
    /// execution re-establishes its real aspects.
    ///
    /// [`export_state`]: CorpusImpl::export_state
    pub fn import_state(&mut self, bytes: &[u8]) -> Result<(), CorpusError> {
        let programs = decode_programs(bytes).map_err(CorpusError::Decode)?;
        for program in programs {
            let aspects = ProgramAspects {
                edges: Default::default(),
                outcome: novafuzz_ir::aspects::OutcomeClass::Succeeded,
            };
            self.add(program, aspects);
        }
        Ok(())
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
    fn export_then_import_round_trips_programs() {
        let mut corpus = CorpusImpl::ring(RingConfig::default());
        let seeded_size = corpus.size();
        corpus.add(program(1), aspects(1));
        corpus.add(program(2), aspects(2));

        let snapshot = corpus.export_state().unwrap();

        let mut restored = CorpusImpl::ring(RingConfig::default());
        restored.import_state(&snapshot).unwrap();
        // the restored corpus's own seed collides with the one carried in the
        // snapshot, so only the two distinct programs add on top of it.
        assert_eq!(restored.size(), seeded_size + 2);
    }

    #[test]
    fn cleanup_is_a_no_op_for_mab_and_markov() {
        let mut mab = CorpusImpl::mab(MabConfig::default());
        let seeded_size = mab.size();
        mab.add(program(1), aspects(1));
        mab.cleanup();
        assert_eq!(mab.size(), seeded_size + 1);
    }

    #[test]
    fn dispatch_selects_through_the_right_variant() {
        let mut corpus = CorpusImpl::markov(MarkovConfig::default());
        corpus.add(program(1), aspects(1));
        let known_hashes: Vec<u32> = decode_programs(&corpus.export_state().unwrap())
            .unwrap()
            .iter()
            .map(novafuzz_ir::Program::content_hash)
            .collect();

        let mut rng = SmallRng::seed_from_u64(0);
        let edge_counts = HashMap::new();
        let selected = corpus.random_for_mutation(&mut rng, &edge_counts);
        assert!(known_hashes.contains(&selected.content_hash()));
    }

    #[test]
    fn new_corpus_is_never_empty_for_every_strategy() {
        assert!(!CorpusImpl::ring(RingConfig::default()).is_empty());
        assert!(!CorpusImpl::mab(MabConfig::default()).is_empty());
        assert!(!CorpusImpl::markov(MarkovConfig::default()).is_empty());
    }
}
