use clap::Args;
use std::path::PathBuf;

use novafuzz_ir::aspects::{EdgeCoverageEvaluator, ProgramAspects};
use novafuzz_ir::executor::InMemoryExecutor;
use novafuzz_ir::snapshot::{decode_programs, encode_programs};
use novafuzz_minimize::{minimize, MinimizerConfig};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::error::{CliError, Result};

pub struct MinimizeCommand;

impl MinimizeCommand {
    pub fn execute(args: &MinimizeArgs) -> Result<()> {
        run_minimize(
            &args.program,
            &args.aspects,
            &args.output,
            args.minimization_limit,
            args.num_test_executions,
            args.max_iterations,
        )
    }
}

/// Minimizes a single serialized program against its recorded aspects.
#[derive(Args)]
pub struct MinimizeArgs {
    #[arg(long, help = "Path to a single-program snapshot file")]
    program: PathBuf,
    #[arg(long, help = "Path to the postcard-encoded ProgramAspects recorded for it")]
    aspects: PathBuf,
    #[arg(long, help = "Path to write the minimized program snapshot")]
    output: PathBuf,
    #[arg(long, default_value_t = 0.0)]
    minimization_limit: f64,
    #[arg(long, default_value_t = 3)]
    num_test_executions: u32,
    #[arg(long, default_value_t = 100)]
    max_iterations: u32,
}

fn run_minimize(
    program_path: &PathBuf,
    aspects_path: &PathBuf,
    output: &PathBuf,
    minimization_limit: f64,
    num_test_executions: u32,
    max_iterations: u32,
) -> Result<()> {
    let program_bytes = std::fs::read(program_path)?;
    let mut programs =
        decode_programs(&program_bytes).map_err(|e| CliError::ProgramValidation(e.to_string()))?;
    let program = programs
        .pop()
        .ok_or_else(|| CliError::InvalidInput("snapshot contains no programs".to_string()))?;

    let aspects_bytes = std::fs::read(aspects_path)?;
    let aspects: ProgramAspects = postcard::from_bytes(&aspects_bytes)?;

    log::info!("minimizing a program with {} instructions", program.instructions.len());

    let mut executor = InMemoryExecutor::new();
    let evaluator = EdgeCoverageEvaluator::new();
    let config = MinimizerConfig { minimization_limit, num_test_executions, max_iterations };
    let mut rng = SmallRng::from_entropy();

    let minimized = minimize(program, aspects, &mut executor, &evaluator, config, &mut rng);
    log::info!("minimized down to {} instructions", minimized.instructions.len());

    let bytes = encode_programs(&[minimized]).map_err(|e| CliError::ProgramValidation(e.to_string()))?;
    std::fs::write(output, bytes)?;
    Ok(())
}
