//! Main entry point for the jarc CLI app

use jarc::cli::{self, Commands};
use jarc::ops;

fn main() -> std::process::ExitCode {
    if let Err(e) = run_app() {
        if e.downcast_ref::<clap::Error>().is_none() {
            eprintln!("Error: {}", e);
        }
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    let command = cli::run()?;

    let outcome = match &command {
        Commands::Create(args) => ops::create(&args.file, &args.jar_options())?,
        Commands::Update(args) => ops::update(&args.file, &args.jar_options())?,
        Commands::Index { archive, extras } => ops::build_index(archive, extras)?,
    };

    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }
    Ok(())
}
