use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use diffpipe::args::{EngineArgs, RunInputs, ServerArgs};
use diffpipe::config::create_config;
use diffpipe::engine::SnakemakeEngine;
use diffpipe::reaper::delete_all_output;
use diffpipe::review::{start_review, ShinyServer};
use diffpipe::runner::{run_direct, run_from_config, RunOutcome};
use diffpipe::utils::format_bytes;
use std::io::{self, BufRead, Write};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Instant;

const DELETE_PROMPT: &str = "Are you sure you want to delete all files generated by the pipeline \
                             (this includes reference indices)?";

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Create a config YAML file for running the Snakemake pipeline. Sample names are \
             either passed as comma separated lists or are read from text files if \
             --use-sample-files is set."
)]
struct CreateConfigArgs {
    #[clap(flatten)]
    inputs: RunInputs,

    /// Where to write the config YAML.
    target_yaml: PathBuf,
}

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Run the Snakemake pipeline using a config file.")]
struct RunFromConfigArgs {
    /// Only dry-run the workflow.
    #[arg(long)]
    dry_run: bool,

    /// The number of cores to use for running the pipeline.
    #[arg(long, default_value = "1")]
    cores: NonZeroU32,

    /// Config YAML written by create-config.
    config_yaml: PathBuf,

    #[clap(flatten)]
    engine: EngineArgs,
}

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Run the Snakemake pipeline from the command line without writing a config file."
)]
struct RunArgs {
    /// Only dry-run the pipeline.
    #[arg(long)]
    dry_run: bool,

    /// The number of cores to use for running the pipeline.
    #[arg(long, default_value = "1")]
    cores: NonZeroU32,

    #[clap(flatten)]
    inputs: RunInputs,

    #[clap(flatten)]
    engine: EngineArgs,
}

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Remove all files generated by the pipeline. This includes reference genome indices, \
             as well. Use with care!"
)]
struct DeleteArgs {
    /// Only list what would be deleted. Nothing is removed, so there is no prompt.
    #[arg(long)]
    dry_run: bool,

    /// Confirm the action without prompting.
    #[arg(short, long)]
    yes: bool,

    /// Config YAML of the run to clean up.
    config_yaml: PathBuf,
}

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Start the shiny GUI on folders generated by the snakemake pipeline.")]
struct ShinyArgs {
    /// Host ip for shiny to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Shiny port number.
    #[arg(long, default_value_t = 9898)]
    port: u16,

    /// Output directories of completed runs.
    #[arg(required = true)]
    project_dirs: Vec<PathBuf>,

    #[clap(flatten)]
    server: ServerArgs,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(alias = "create_config")]
    CreateConfig(CreateConfigArgs),
    #[command(alias = "run_snakemake_from_config")]
    RunSnakemakeFromConfig(RunFromConfigArgs),
    #[command(alias = "run_snakemake")]
    RunSnakemake(RunArgs),
    #[command(alias = "delete_all_output")]
    DeleteAllOutput(DeleteArgs),
    #[command(alias = "run_shiny")]
    RunShiny(ShinyArgs),
}

/// Asks `question` on stderr and reads a yes/no answer from stdin.
fn confirm(question: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{} [y/N]: ", question)?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn report_outcome(outcome: RunOutcome) -> Result<()> {
    if let RunOutcome::Planned { summary } = outcome.into_result()? {
        println!("{}", summary);
    } else {
        log::info!("workflow completed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match args.cmd {
        Commands::CreateConfig(cmd_args) => {
            create_config(&cmd_args.inputs, &cmd_args.target_yaml)?;
        }
        Commands::RunSnakemakeFromConfig(cmd_args) => {
            let start = Instant::now();
            let engine = SnakemakeEngine::from(cmd_args.engine);
            let outcome = run_from_config(
                &engine,
                &cmd_args.config_yaml,
                cmd_args.dry_run,
                cmd_args.cores,
            )?;
            report_outcome(outcome)?;
            log::info!("run took: {:?}", start.elapsed());
        }
        Commands::RunSnakemake(cmd_args) => {
            let start = Instant::now();
            let engine = SnakemakeEngine::from(cmd_args.engine);
            let outcome = run_direct(&engine, cmd_args.dry_run, cmd_args.cores, &cmd_args.inputs)?;
            report_outcome(outcome)?;
            log::info!("run took: {:?}", start.elapsed());
        }
        Commands::DeleteAllOutput(cmd_args) => {
            if !cmd_args.dry_run && !cmd_args.yes && !confirm(DELETE_PROMPT)? {
                bail!("aborted, nothing was deleted");
            }
            let report = delete_all_output(cmd_args.dry_run, &cmd_args.config_yaml)?;
            if report.dry_run {
                for path in &report.planned {
                    println!("{}", path.display());
                }
                log::info!(
                    "{} path(s) would be deleted, {} in total",
                    report.planned.len(),
                    format_bytes(report.planned_bytes as f64)
                );
            } else {
                log::info!(
                    "deleted {} path(s), {} freed",
                    report.deleted.len(),
                    format_bytes(report.deleted_bytes as f64)
                );
            }
        }
        Commands::RunShiny(cmd_args) => {
            let server = ShinyServer::from(cmd_args.server);
            start_review(&server, &cmd_args.project_dirs, &cmd_args.host, cmd_args.port)?;
        }
    }

    Ok(())
}
