use std::fmt::Display;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use phyloml::distances::DEFAULT_MAX_DISTANCE;
use phyloml::evolutionary_models::ModelType;
use phyloml::pairwise_alignment::{
    AlignmentScoring, DEFAULT_GAP_EXTEND, DEFAULT_GAP_OPEN, DEFAULT_MATCH, DEFAULT_MISMATCH,
};
use phyloml::substitution_models::SubstitutionModel;

use crate::Result;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(super) struct Cli {
    /// Log progress information to the console
    #[arg(short, long, global = true)]
    pub(super) verbose: bool,

    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Subcommand, Debug)]
pub(super) enum Commands {
    /// Aligns the first two sequences of the file with affine gap costs
    Align {
        /// Sequence file in fasta format
        #[arg(short, long, value_name = "SEQ_FILE")]
        seq_file: PathBuf,

        /// Score of identical characters
        #[arg(long = "match", default_value_t = DEFAULT_MATCH, allow_negative_numbers = true)]
        match_score: f64,

        /// Score of differing characters
        #[arg(long, default_value_t = DEFAULT_MISMATCH, allow_negative_numbers = true)]
        mismatch: f64,

        /// Gap opening penalty
        #[arg(short = 'o', long, default_value_t = DEFAULT_GAP_OPEN, allow_negative_numbers = true)]
        gap_open: f64,

        /// Gap extension penalty
        #[arg(short = 'e', long, default_value_t = DEFAULT_GAP_EXTEND, allow_negative_numbers = true)]
        gap_extend: f64,
    },
    /// Estimates maximum likelihood distances between all pairs of sequences
    Distances {
        /// Sequence file in fasta format
        #[arg(short, long, value_name = "SEQ_FILE")]
        seq_file: PathBuf,

        /// Sequence evolution model
        #[arg(short, long, value_name = "MODEL", default_value = "JC69")]
        model: String,

        /// Sequence evolution model parameters, e.g. kappa for K80
        #[arg(short = 'p', long, value_name = "MODEL_PARAMS", num_args = 1..)]
        model_params: Vec<f64>,

        /// Upper bound of a distance, saturated pairs are reported with it
        #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
        max_distance: f64,

        /// Fit the model parameters together with each distance
        #[arg(long)]
        joint: bool,
    },
}

#[derive(Debug)]
pub(super) enum Task {
    Align {
        scoring: AlignmentScoring,
    },
    Distances {
        model: SubstitutionModel,
        max_distance: f64,
        joint: bool,
    },
}

#[derive(Debug)]
pub(super) struct Config {
    pub(super) seq_file: PathBuf,
    pub(super) verbose: bool,
    pub(super) task: Task,
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sequence file: {}", self.seq_file.display())?;
        match &self.task {
            Task::Align { scoring } => write!(f, "Pairwise alignment with {}", scoring),
            Task::Distances {
                model,
                max_distance,
                joint,
            } => {
                writeln!(f, "Pairwise distances under {}", model)?;
                writeln!(f, "Maximum distance: {}", max_distance)?;
                write!(f, "Joint model fit: {}", joint)
            }
        }
    }
}

pub(super) struct ConfigBuilder {
    cli: Cli,
}

impl From<Cli> for ConfigBuilder {
    fn from(cli: Cli) -> Self {
        ConfigBuilder { cli }
    }
}

impl ConfigBuilder {
    /// Validates the arguments and builds the scoring scheme or model they name.
    pub(super) fn setup(self) -> Result<Config> {
        let verbose = self.cli.verbose;
        let (seq_file, task) = match self.cli.command {
            Commands::Align {
                seq_file,
                match_score,
                mismatch,
                gap_open,
                gap_extend,
            } => {
                let scoring =
                    AlignmentScoring::simple(match_score, mismatch, gap_open, gap_extend)?;
                (seq_file, Task::Align { scoring })
            }
            Commands::Distances {
                seq_file,
                model,
                model_params,
                max_distance,
                joint,
            } => {
                let model = SubstitutionModel::new(ModelType::from_name(&model)?, &model_params)?;
                let task = Task::Distances {
                    model,
                    max_distance,
                    joint,
                };
                (seq_file, task)
            }
        };
        Ok(Config {
            seq_file,
            verbose,
            task,
        })
    }
}
