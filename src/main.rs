use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use langnet::{
    ActivationSet, ConfigOverrides, CrossValidationTrainer, LanguageTable, Mlp, Predictor,
    RequiredImprovement, ResilientTrainer, SessionConfig, TrainReport, Trainer, load_dataset,
    load_features, logging,
};

#[derive(Parser)]
#[command(name = "langnet", version, about = "Language identification network")]
struct Cli {
    /// JSON file with session settings; command-line flags take precedence.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train with K-fold cross-validation for a fixed number of epochs.
    Kfold {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(short, long, value_name = "INT")]
        epochs: Option<usize>,
        #[arg(short = 'k', long, value_name = "INT")]
        folds: Option<usize>,
        /// Where to save the trained network.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Train with resilient propagation until the target error is reached.
    Resilient {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, value_name = "REAL")]
        error_rate: Option<f32>,
        /// Consecutive iterations without 1% improvement before stopping.
        #[arg(long, value_name = "INT")]
        stall_cycles: Option<usize>,
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Report accuracy of a saved network on a dataset.
    Evaluate {
        #[arg(short, long, value_name = "PATH")]
        model: PathBuf,
        #[arg(short, long, value_name = "PATH")]
        data: PathBuf,
    },
    /// Classify one feature vector with a saved network.
    Predict {
        #[arg(short, long, value_name = "PATH")]
        model: PathBuf,
        /// Language names, one per line, in output order.
        #[arg(short, long, value_name = "PATH")]
        languages: PathBuf,
        /// File holding one delimited row of features.
        #[arg(long, value_name = "PATH")]
        vector: PathBuf,
        #[arg(long, value_name = "INT")]
        input_size: Option<usize>,
        #[arg(long, value_name = "INT")]
        outputs: Option<usize>,
    },
}

#[derive(Args)]
struct SessionArgs {
    #[arg(short, long, value_name = "PATH")]
    data: PathBuf,
    #[arg(long, value_name = "INT")]
    input_size: Option<usize>,
    #[arg(long, value_name = "INT")]
    outputs: Option<usize>,
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = HiddenActivation::Relu)]
    hidden: HiddenActivation,
}

#[derive(Clone, Copy, ValueEnum)]
enum HiddenActivation {
    Relu,
    Tanh,
}

impl SessionArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_size: self.input_size,
            outputs: self.outputs,
            seed: self.seed,
            ..ConfigOverrides::default()
        }
    }

    fn activations(&self) -> ActivationSet {
        match self.hidden {
            HiddenActivation::Relu => ActivationSet::relu(),
            HiddenActivation::Tanh => ActivationSet::tanh(),
        }
    }
}

fn resolve(config: Option<&PathBuf>, cli: ConfigOverrides) -> langnet::Result<SessionConfig> {
    let file = match config {
        Some(path) => ConfigOverrides::from_json_file(path)?,
        None => ConfigOverrides::default(),
    };
    SessionConfig::resolve(file.merge(cli))
}

fn train_and_report<T: Trainer>(
    trainer: &T,
    session: &SessionArgs,
    cfg: &SessionConfig,
) -> Result<TrainReport, Box<dyn Error>> {
    let data = load_dataset(&session.data, cfg.input_size, cfg.outputs)?;
    let mut mlp = cfg
        .network()?
        .with_activations(session.activations())
        .build()?;

    let report = trainer.train(&mut mlp, &data)?;
    mlp.evaluate(&data)?;
    Ok(report)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    match cli.command {
        Command::Kfold {
            session,
            epochs,
            folds,
            output,
        } => {
            let cfg = resolve(
                cli.config.as_ref(),
                ConfigOverrides {
                    epochs,
                    fold_count: folds,
                    kfold_artifact: output,
                    ..session.overrides()
                },
            )?;
            let trainer =
                CrossValidationTrainer::new(cfg.epochs, cfg.fold_count, &cfg.kfold_artifact);
            let report = train_and_report(&trainer, &session, &cfg)?;
            info!(outcome = ?report.outcome, artifact = %report.artifact.display(), "done");
        }
        Command::Resilient {
            session,
            error_rate,
            stall_cycles,
            output,
        } => {
            let cfg = resolve(
                cli.config.as_ref(),
                ConfigOverrides {
                    error_rate,
                    stall_cycles,
                    resilient_artifact: output,
                    ..session.overrides()
                },
            )?;
            let trainer = ResilientTrainer::new(cfg.error_rate, &cfg.resilient_artifact)
                .with_required_improvement(Some(RequiredImprovement::new(cfg.stall_cycles)));
            let report = train_and_report(&trainer, &session, &cfg)?;
            info!(outcome = ?report.outcome, artifact = %report.artifact.display(), "done");
        }
        Command::Evaluate { model, data } => {
            let mlp = Mlp::load_json(&model)?;
            let data = load_dataset(&data, mlp.input_dim(), mlp.output_dim())?;
            mlp.evaluate(&data)?;
        }
        Command::Predict {
            model,
            languages,
            vector,
            input_size,
            outputs,
        } => {
            let cfg = resolve(
                cli.config.as_ref(),
                ConfigOverrides {
                    input_size,
                    outputs,
                    ..ConfigOverrides::default()
                },
            )?;
            let languages = LanguageTable::from_file(&languages)?;
            let predictor = Predictor::load(&model, cfg.input_size, cfg.outputs, languages)?;
            let features = load_features(&vector)?;
            let prediction = predictor.predict(&features)?;
            println!("{}", prediction.label);
        }
    }

    Ok(())
}
