use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use novafuzz_corpus::{CorpusImpl, MabConfig, MarkovConfig, RingConfig};
use novafuzz_ir::aspects::{EdgeCoverageEvaluator, Evaluator, OutcomeClass, ProgramAspects};
use novafuzz_ir::executor::{Executor, InMemoryExecutor, Outcome};
use novafuzz_ir::operation::{BinaryOperator, Operation};
use novafuzz_ir::{builder::ProgramBuilder, instruction::Instruction, Program};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::{CliError, Result};

pub struct RunCommand;

impl RunCommand {
    pub fn execute(args: &RunArgs) -> Result<()> {
        run_loop(args.strategy, args.iterations, &args.output)
    }
}

/// Runs a bounded in-process fuzzing loop against the reference executor/evaluator.
#[derive(Args)]
pub struct RunArgs {
    #[arg(long, value_enum, default_value_t = Strategy::Ring)]
    strategy: Strategy,
    #[arg(long, default_value_t = 10_000)]
    iterations: u64,
    #[arg(long, help = "Path to write the final corpus snapshot")]
    output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Strategy {
    Ring,
    Mab,
    Markov,
}

fn seed_program() -> Program {
    let mut builder = ProgramBuilder::new();
    builder.append(Instruction::new(Operation::LoadInteger(0), vec![])).unwrap();
    builder.finalize().unwrap()
}

/// Stands in for the real mutation engine, which stays out of scope: grows a
/// copy of `seed` by a handful of arithmetic instructions, occasionally
/// introducing a division the reference executor treats as a crash. Just
/// enough to give the corpus/scheduler something to select between.
fn mutate<R: Rng>(seed: &Program, rng: &mut R) -> Option<Program> {
    let mut builder = ProgramBuilder::from_program(seed).ok()?;
    let extra = rng.gen_range(1..=3);
    for _ in 0..extra {
        let instruction = if builder.variable_count() < 2 || rng.gen_bool(0.4) {
            Instruction::new(Operation::LoadInteger(rng.gen_range(-8..8)), vec![])
        } else {
            let lhs = builder.random_variable(rng)?;
            let rhs = builder.random_variable(rng)?;
            let ops = [
                BinaryOperator::Add,
                BinaryOperator::Sub,
                BinaryOperator::Mul,
                BinaryOperator::Div,
            ];
            let op = ops[rng.gen_range(0..ops.len())];
            Instruction::new(Operation::BinaryOperation(op), vec![lhs, rhs])
        };
        if builder.append(instruction).is_err() {
            return None;
        }
    }
    builder.finalize().ok()
}

fn run_loop(strategy: Strategy, iterations: u64, output: &PathBuf) -> Result<()> {
    let mut corpus = match strategy {
        Strategy::Ring => CorpusImpl::ring(RingConfig::default()),
        Strategy::Mab => CorpusImpl::mab(MabConfig::default()),
        Strategy::Markov => CorpusImpl::markov(MarkovConfig::default()),
    };

    let mut executor = InMemoryExecutor::new();
    let mut evaluator = EdgeCoverageEvaluator::new();
    evaluator.enable_edge_tracking();
    let mut rng = SmallRng::from_entropy();

    let seed = seed_program();
    let execution = executor.execute(&seed, Duration::from_millis(100));
    let aspects = evaluator.evaluate(&execution).unwrap_or(ProgramAspects {
        edges: Default::default(),
        outcome: OutcomeClass::Succeeded,
    });
    corpus.add(seed, aspects);

    let mut interesting = 0u64;
    let mut crashes = 0u64;

    for i in 0..iterations {
        let edge_counts = evaluator.edge_counts();
        let parent = corpus.random_for_mutation(&mut rng, &edge_counts).clone();
        let Some(candidate) = mutate(&parent, &mut rng) else {
            continue;
        };

        let execution = executor.execute(&candidate, Duration::from_millis(100));
        if matches!(execution.outcome, Outcome::Crashed(_)) {
            crashes += 1;
            log::warn!("iteration {i}: candidate crashed ({:?})", execution.outcome);
        }

        if let Some(aspects) = evaluator.evaluate(&execution) {
            interesting += 1;
            corpus.add(candidate, aspects);
        }

        if i % 1000 == 0 {
            corpus.cleanup();
        }
    }

    log::info!(
        "ran {iterations} iterations: corpus size {}, {interesting} interesting, {crashes} crashes",
        corpus.size()
    );

    let bytes = corpus
        .export_state()
        .map_err(|e| CliError::ProgramValidation(e.to_string()))?;
    std::fs::write(output, bytes)?;
    Ok(())
}
