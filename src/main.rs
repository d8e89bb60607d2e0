use std::process::ExitCode;

use wardsim::news::ContextNewsExt;
use wardsim::runner::run_with_args;
use wardsim::scenario;

fn main() -> ExitCode {
    // Try running the following:
    // cargo run -- --random-seed 42
    // cargo run -- --config tests/data/hospital.json --output-dir output --log-level info
    let context = match run_with_args(|context, _| scenario::init(context)) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("wardsim: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Simulation complete at t={}. {} news item(s) left unread.",
        context.get_current_time(),
        context.news_len()
    );
    ExitCode::SUCCESS
}
