pub mod args;
pub mod config;
pub mod engine;
pub mod errors;
pub mod reaper;
pub mod review;
pub mod runner;
pub mod samples;
pub mod utils;

pub use config::{GenomeBuild, RunSpecification};
pub use errors::{PipelineError, Result};
pub use runner::RunOutcome;
