use std::fmt::Write;

use anyhow::{anyhow, bail, Error};
use clap::Parser;
use ftail::Ftail;
use log::{info, LevelFilter};

use phyloml::distances::DistanceEstimator;
use phyloml::errors::PhyloError;
use phyloml::io::read_sequences;
use phyloml::pairwise_alignment::PairwiseAligner;

mod cli;
use crate::cli::{Cli, Config, ConfigBuilder, Task};

type Result<T> = std::result::Result<T, Error>;

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            bail!("Unable to parse command line arguments: \n {}", error)
        }
    };
    let cfg_build: ConfigBuilder = cli.into();
    let cfg = cfg_build.setup()?;

    let level = if cfg.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    Ftail::new()
        .console(level)
        .init()
        .map_err(|e| anyhow!("Unable to set up logging: {:?}", e))?;

    info!("phyloml run started.");
    info!("{}", cfg);

    print!("{}", run(&cfg)?);
    Ok(())
}

/// Runs the configured task and returns its output.
fn run(cfg: &Config) -> Result<String> {
    info!("Running on sequences from {}.", cfg.seq_file.display());
    let records = read_sequences(&cfg.seq_file)?;
    let mut output = String::new();
    match &cfg.task {
        Task::Align { scoring } => {
            let [x, y, ..] = records.as_slice() else {
                bail!(PhyloError::InvalidInput(format!(
                    "Alignment needs two sequences, {} has {}",
                    cfg.seq_file.display(),
                    records.len()
                )));
            };
            let alignment = PairwiseAligner::new(scoring.clone()).align(x.seq(), y.seq())?;
            let (gapped_x, gapped_y) = alignment.gapped_sequences(x.seq(), y.seq(), 1);
            writeln!(output, ">{}", x.id())?;
            writeln!(output, "{}", String::from_utf8_lossy(&gapped_x))?;
            writeln!(output, ">{}", y.id())?;
            writeln!(output, "{}", String::from_utf8_lossy(&gapped_y))?;
            writeln!(output, "score: {}", alignment.score)?;
        }
        Task::Distances {
            model,
            max_distance,
            joint,
        } => {
            let matrix = DistanceEstimator::new(model.clone())
                .max_distance(*max_distance)
                .joint(*joint)
                .distance_matrix(&records)?;
            info!("{} saturated pairs", matrix.saturated.len());
            write!(output, "{}", matrix)?;
        }
    }
    Ok(output)
}
