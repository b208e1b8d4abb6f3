use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

use novafuzz_ir::snapshot::{decode_programs, encode_programs};
use novafuzz_ir::Program;

use crate::error::{CliError, Result};

pub struct CorpusCommand;

impl CorpusCommand {
    pub fn execute(command: &CorpusCommands) -> Result<()> {
        match command {
            CorpusCommands::Convert { from, to, input, output } => convert(from, to, input, output),
            CorpusCommands::Print { input, json } => print_programs(input, *json),
            CorpusCommands::Stats { input } => stats(input),
        }
    }
}

#[derive(Subcommand)]
pub enum CorpusCommands {
    /// Convert a corpus snapshot between postcard and JSON
    Convert {
        #[arg(long, value_enum, default_value_t = SnapshotFormat::Postcard)]
        from: SnapshotFormat,
        #[arg(long, value_enum, default_value_t = SnapshotFormat::Json)]
        to: SnapshotFormat,
        #[arg(long, help = "Path to the input snapshot file")]
        input: PathBuf,
        #[arg(long, help = "Path to the converted snapshot file")]
        output: PathBuf,
    },
    /// Print a snapshot's programs, human readable or as JSON
    Print {
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(help = "Path to the input snapshot file")]
        input: PathBuf,
    },
    /// Print program-count / instruction-count summary statistics
    Stats {
        #[arg(help = "Path to the input snapshot file")]
        input: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SnapshotFormat {
    Postcard,
    Json,
}

fn read_programs(path: &PathBuf, format: SnapshotFormat) -> Result<Vec<Program>> {
    let bytes = std::fs::read(path)?;
    match format {
        SnapshotFormat::Postcard => decode_programs(&bytes).map_err(|e| CliError::ProgramValidation(e.to_string())),
        SnapshotFormat::Json => Ok(serde_json::from_slice(&bytes)?),
    }
}

fn write_programs(path: &PathBuf, format: SnapshotFormat, programs: &[Program]) -> Result<()> {
    let bytes = match format {
        SnapshotFormat::Postcard => encode_programs(programs).map_err(|e| CliError::ProgramValidation(e.to_string()))?,
        SnapshotFormat::Json => serde_json::to_vec(programs)?,
    };
    std::fs::write(path, bytes)?;
    Ok(())
}

fn convert(from: &SnapshotFormat, to: &SnapshotFormat, input: &PathBuf, output: &PathBuf) -> Result<()> {
    let programs = read_programs(input, *from)?;
    log::info!("converting {} programs", programs.len());
    write_programs(output, *to, &programs)
}

fn print_programs(input: &PathBuf, json: bool) -> Result<()> {
    let programs = read_programs(input, SnapshotFormat::Postcard)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&programs)?);
    } else {
        for program in &programs {
            println!("{program}");
        }
    }
    Ok(())
}

fn stats(input: &PathBuf) -> Result<()> {
    let programs = read_programs(input, SnapshotFormat::Postcard)?;
    let count = programs.len();
    let total: usize = programs.iter().map(|p| p.instructions.len()).sum();
    let average = if count == 0 { 0.0 } else { total as f64 / count as f64 };

    println!("programs: {count}");
    println!("total instructions: {total}");
    println!("average instructions/program: {average:.2}");
    Ok(())
}
