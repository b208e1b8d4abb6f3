use std::collections::{BTreeSet, HashMap, HashSet};

use crate::executor::{Execution, Outcome};

/// A coarser-grained classification of [`Outcome`] used for grouping
/// aspects — crashes are distinguished by signal, everything else
/// collapses to a single bucket per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OutcomeClass {
    Succeeded,
    Failed,
    Crashed(i32),
    TimedOut,
}

impl From<&Outcome> for OutcomeClass {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => OutcomeClass::Succeeded,
            Outcome::Failed(_) => OutcomeClass::Failed,
            Outcome::Crashed(signal) => OutcomeClass::Crashed(*signal),
            Outcome::TimedOut => OutcomeClass::TimedOut,
        }
    }
}

/// An opaque token describing what was interesting about one execution: the
/// coverage edges it newly exercised plus the outcome class it produced.
/// Used as the minimizer's oracle via [`Evaluator::has_aspects`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgramAspects {
    pub edges: BTreeSet<u32>,
    pub outcome: OutcomeClass,
}

/// Maps an [`Execution`] to the set of novel properties it exhibits.
pub trait Evaluator {
    /// Record `execution` against this evaluator's running state and, if it
    /// exhibits anything novel (new edges, or a first-seen outcome class),
    /// return the aspects describing that novelty.
    fn evaluate(&mut self, execution: &Execution) -> Option<ProgramAspects>;

    /// Does `execution` still exhibit everything captured by `aspects`?
    /// Used as the minimizer's oracle; must not mutate coverage state.
    fn has_aspects(&self, execution: &Execution, aspects: &ProgramAspects) -> bool;

    /// Per-edge hit counts accumulated so far, for schedulers (e.g. the
    /// Markov strategy) that weight by edge rarity. Evaluators that do not
    /// track counts may leave this empty.
    fn edge_counts(&self) -> HashMap<u32, u32> {
        HashMap::new()
    }

    /// Enable any extra bookkeeping required to make [`edge_counts`]
    /// meaningful. A no-op for evaluators that always track counts.
    ///
    /// [`edge_counts`]: Evaluator::edge_counts
    fn enable_edge_tracking(&mut self) {}
}

fn decode_edges(fuzzout: &[u8]) -> BTreeSet<u32> {
    fuzzout
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// A reference evaluator that treats `Execution::fuzzout` as a stream of
/// little-endian `u32` edge ids (the format [`InMemoryExecutor`] produces)
/// and tracks global novelty across calls.
///
/// [`InMemoryExecutor`]: crate::executor::InMemoryExecutor
#[derive(Debug, Default)]
pub struct EdgeCoverageEvaluator {
    seen_edges: HashSet<u32>,
    seen_outcomes: HashSet<OutcomeClass>,
    edge_counts: HashMap<u32, u32>,
    track_counts: bool,
}

impl EdgeCoverageEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Evaluator for EdgeCoverageEvaluator {
    fn evaluate(&mut self, execution: &Execution) -> Option<ProgramAspects> {
        let edges = decode_edges(&execution.fuzzout);
        if self.track_counts {
            for edge in &edges {
                *self.edge_counts.entry(*edge).or_insert(0) += 1;
            }
        }

        let new_edges: BTreeSet<u32> = edges
            .iter()
            .filter(|e| !self.seen_edges.contains(*e))
            .copied()
            .collect();
        let outcome = OutcomeClass::from(&execution.outcome);
        let new_outcome = self.seen_outcomes.insert(outcome);

        self.seen_edges.extend(&new_edges);

        if new_edges.is_empty() && !new_outcome {
            return None;
        }

        Some(ProgramAspects {
            edges: new_edges,
            outcome,
        })
    }

    fn has_aspects(&self, execution: &Execution, aspects: &ProgramAspects) -> bool {
        let edges = decode_edges(&execution.fuzzout);
        let outcome = OutcomeClass::from(&execution.outcome);
        outcome == aspects.outcome && aspects.edges.is_subset(&edges)
    }

    fn edge_counts(&self) -> HashMap<u32, u32> {
        self.edge_counts.clone()
    }

    fn enable_edge_tracking(&mut self) {
        self.track_counts = true;
    }
}
