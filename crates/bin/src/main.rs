//! smogcast CLI binary.
//!
//! Trains and publishes the PM2.5 model, uploads batches, and runs batch
//! inference with a published artifact.

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use smogcast::output::{ExportFormat, Exporter};
use smogcast::{
    FittedPipeline, PipelineConfig, fetch_pipeline, predict_file, push_batches, run_training_job,
};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smogcast")]
#[command(about = "PM2.5 model training and batch inference", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// JSON config file; flags override its values
    #[arg(long, global = true, env = "SMOGCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Blob container URL (takes precedence over --store-dir)
    #[arg(long, global = true, env = "SMOGCAST_CONTAINER_URL")]
    container_url: Option<String>,

    /// SAS token appended to container requests
    #[arg(long, global = true, env = "SMOGCAST_SAS_TOKEN", hide_env_values = true)]
    sas_token: Option<String>,

    /// Local directory used as the store
    #[arg(long, global = true, env = "SMOGCAST_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Storage request timeout in seconds
    #[arg(long, global = true, env = "SMOGCAST_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge batches, train, evaluate and publish the model
    Train {
        /// Historical batch object name
        #[arg(long, env = "SMOGCAST_HISTORICAL_BATCH")]
        historical: Option<String>,

        /// Live batch object name
        #[arg(long, env = "SMOGCAST_LIVE_BATCH")]
        live: Option<String>,

        /// Object name to publish the artifact under
        #[arg(long, env = "SMOGCAST_ARTIFACT_NAME")]
        artifact_name: Option<String>,

        /// Merged snapshot path
        #[arg(long, env = "SMOGCAST_SNAPSHOT_PATH")]
        snapshot: Option<PathBuf>,

        /// Local artifact path
        #[arg(long, env = "SMOGCAST_LOCAL_ARTIFACT")]
        local_artifact: Option<PathBuf>,

        /// Split seed
        #[arg(long, env = "SMOGCAST_SEED")]
        seed: Option<u64>,

        /// Held-out fraction
        #[arg(long, env = "SMOGCAST_TEST_FRACTION")]
        test_fraction: Option<f64>,

        /// Also write the training report as JSON
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Predict PM2.5 for an observation CSV
    Predict {
        /// Observation CSV in the batch schema
        input: PathBuf,

        /// Local artifact to load instead of fetching the published one
        #[arg(long)]
        artifact: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (csv, json or pretty-json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Upload local batch CSV files under their file names
    Push {
        /// Batch files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// `RUST_LOG` if set, otherwise `SMOGCAST_LOG_LEVEL`, otherwise `info`.
fn init_tracing() {
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SMOGCAST_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.store)?;

    match cli.command {
        Commands::Train {
            historical,
            live,
            artifact_name,
            snapshot,
            local_artifact,
            seed,
            test_fraction,
            report_json,
        } => {
            if let Some(name) = historical {
                config.historical_batch = name;
            }
            if let Some(name) = live {
                config.live_batch = name;
            }
            if let Some(name) = artifact_name {
                config.artifact_name = name;
            }
            if let Some(path) = snapshot {
                config.snapshot_path = path;
            }
            if let Some(path) = local_artifact {
                config.local_artifact_path = path;
            }
            if let Some(seed) = seed {
                config.train.seed = seed;
            }
            if let Some(fraction) = test_fraction {
                config.train.test_fraction = fraction;
            }
            train(&config, report_json)?;
        }
        Commands::Predict {
            input,
            artifact,
            output,
            format,
        } => {
            let format: ExportFormat = format.parse()?;
            predict(&config, &input, artifact, output, format)?;
        }
        Commands::Push { files } => {
            config.log_config();
            let store = config.store.open()?;
            let names = push_batches(store.as_ref(), &files)?;
            println!("Uploaded {} batch(es): {}", names.len(), names.join(", "));
        }
    }

    Ok(())
}

fn load_config(args: &StoreArgs) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(url) = &args.container_url {
        config.store.container_url = Some(url.clone());
    }
    if let Some(token) = &args.sas_token {
        config.store.sas_token = Some(token.clone());
    }
    if let Some(dir) = &args.store_dir {
        config.store.local_dir = dir.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.store.timeout_secs = secs;
    }
    Ok(config)
}

fn train(
    config: &PipelineConfig,
    report_json: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.log_config();
    let store = config.store.open()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Training stacked ensemble...");

    let run = match run_training_job(store.as_ref(), config) {
        Ok(run) => {
            pb.finish_with_message(format!(
                "Trained on {} rows, R² {:.4}",
                run.report.split.train_rows, run.report.metrics.r2
            ));
            run
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    println!("{}", run.report.to_ascii_table());
    if let Some(path) = report_json {
        std::fs::write(&path, run.report.to_json()?)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn predict(
    config: &PipelineConfig,
    input: &Path,
    artifact: Option<PathBuf>,
    output: Option<PathBuf>,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = match artifact {
        Some(path) => FittedPipeline::load(&path)?,
        None => {
            let store = config.store.open()?;
            fetch_pipeline(store.as_ref(), &config.artifact_name)?
        }
    };

    let records = predict_file(&pipeline, input)?;
    match output {
        Some(path) => {
            records.export_to_file(&path, format)?;
            println!("Wrote {} predictions to {}", records.len(), path.display());
        }
        None => print!("{}", records.export_to_string(format)?),
    }
    Ok(())
}
