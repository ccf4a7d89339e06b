use crate::config::GenomeBuild;
use crate::engine::SnakemakeEngine;
use crate::review::ShinyServer;
use clap::Args;
use std::num::NonZeroU32;
use std::path::PathBuf;

// Inputs shared by `create-config` and `run-snakemake`. Sample names are
// either comma separated lists or text files with one name per line.
#[derive(Args, Debug, Clone)]
pub struct RunInputs {
    /// Load sample names from text files instead of passing them as a comma separated list.
    #[arg(long)]
    pub use_sample_files: bool,

    /// Build of the reference used for annotation.
    #[arg(
        long = "genome-build",
        alias = "genome_build",
        value_enum,
        default_value_t = GenomeBuild::Hg38
    )]
    pub genome_build: GenomeBuild,

    /// The number of cores to use per job.
    #[arg(long, default_value = "1")]
    pub cores_per_job: NonZeroU32,

    /// Directory holding the FASTQ files of all samples.
    pub fastq_dir: PathBuf,

    /// Reference genome FASTA. Index files are written next to it.
    pub reference_fasta: PathBuf,

    /// First comparison group (comma separated names, or a file with --use-sample-files).
    pub group1: String,

    /// Second comparison group (comma separated names, or a file with --use-sample-files).
    pub group2: String,

    /// Directory receiving all pipeline results.
    pub output_dir: PathBuf,
}

// How to reach the workflow engine.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Snakemake executable.
    #[arg(long = "snakemake", env = "DIFFPIPE_SNAKEMAKE", default_value = "snakemake")]
    pub executable: PathBuf,

    /// Snakefile describing the differential-analysis workflow.
    #[arg(long, env = "DIFFPIPE_SNAKEFILE", default_value = "workflow/Snakefile")]
    pub snakefile: PathBuf,

    /// Extra arguments handed to snakemake unchanged (after `--`).
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

impl From<EngineArgs> for SnakemakeEngine {
    fn from(item: EngineArgs) -> Self {
        SnakemakeEngine::new(item.executable, item.snakefile).with_extra_args(item.extra_args)
    }
}

// How to start the review application.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Rscript executable.
    #[arg(long, env = "DIFFPIPE_RSCRIPT", default_value = "Rscript")]
    pub rscript: PathBuf,

    /// Directory of the shiny application.
    #[arg(long, env = "DIFFPIPE_SHINY_APP", default_value = "shiny")]
    pub app_dir: PathBuf,
}

impl From<ServerArgs> for ShinyServer {
    fn from(item: ServerArgs) -> Self {
        ShinyServer::new(item.rscript, item.app_dir)
    }
}
