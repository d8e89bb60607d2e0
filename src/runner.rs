use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};
use log::info;

use crate::context::Context;
use crate::error::SimError;
use crate::log::set_log_level_from_str;
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;

/// Default cli arguments for the wardsim runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed; overrides the seed in the config file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a parameters config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional path for report output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Replace report files left by an earlier run
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(short, long)]
    pub log_level: Option<String>,
}

fn create_cli() -> Command {
    let cli = Command::new("wardsim");
    BaseArgs::augment_args(cli)
}

/// Parses the command line and runs a simulation set up by `setup_fn`.
///
/// # Errors
/// Returns an error if the arguments cannot be parsed or the run cannot be
/// set up
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Context, &BaseArgs) -> Result<(), SimError>,
{
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(args, setup_fn)
}

/// Sets up a context from already-parsed arguments, runs `setup_fn`, and
/// executes the simulation.
///
/// # Errors
/// Returns an error if the log level, config file, or setup function is
/// rejected
pub fn run_with_args_internal<F>(
    args: BaseArgs,
    setup_fn: F,
) -> Result<Context, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Context, &BaseArgs) -> Result<(), SimError>,
{
    if let Some(level) = &args.log_level {
        set_log_level_from_str(level)?;
    }

    // Instantiate a context
    let mut context = Context::new();

    // Optionally load parameters from a file
    if let Some(config_path) = &args.config {
        info!("loading parameters from {}", config_path.display());
        context.init_parameters(config_path)?;
    }

    // Optionally set output dir for reports
    if let Some(output_dir) = &args.output_dir {
        context.report_options().directory(output_dir.clone());
    }
    context.report_options().overwrite(args.force_overwrite);

    let seed = args
        .random_seed
        .unwrap_or_else(|| context.get_parameters().seed);
    context.init_random(seed);

    setup_fn(&mut context, &args)?;

    // Execute the context
    context.execute();
    Ok(context)
}
