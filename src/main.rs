use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;
use vibr::app::GenerationService;
use vibr::domain::GenerationResult;
use vibr::infra::templates::classify;

#[derive(Debug, Parser)]
#[command(name = "vibr", version, about = "Generate small pygame programs from a text prompt")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a new game from a description.
    Generate { prompt: String },
    /// Modify an existing game program.
    Update {
        /// File holding the current program source.
        #[arg(long, value_name = "PATH")]
        code_file: PathBuf,
        prompt: String,
    },
    /// Print the archetype the offline generator would pick.
    Classify { prompt: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Classify { prompt } => {
            println!("{}", classify(&prompt));
            Ok(())
        }
        Command::Generate { prompt } => {
            let service = build_service()?;
            let result = service
                .generate(&prompt)
                .map_err(|err| format!("{} ({err})", err.user_message()))?;
            print_result(&result);
            Ok(())
        }
        Command::Update { code_file, prompt } => {
            let existing_code = fs::read_to_string(&code_file)
                .map_err(|err| format!("failed to read {}: {err}", code_file.display()))?;
            let service = build_service()?;
            let result = service
                .update(&existing_code, &prompt)
                .map_err(|err| format!("{} ({err})", err.user_message()))?;
            print_result(&result);
            Ok(())
        }
    }
}

fn build_service() -> Result<GenerationService, String> {
    GenerationService::from_env().map_err(|err| format!("failed to start generator: {err}"))
}

fn print_result(result: &GenerationResult) {
    print!("{}", result.source_code);
    if !result.source_code.ends_with('\n') {
        println!();
    }
    eprintln!("provider: {}", result.provider_used);
}
