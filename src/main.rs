//! Murmur CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use murmur::cli::{run_devices, run_download, run_file, run_record, Cli, Commands};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    // Logging goes to stderr; transcripts own stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Devices => run_devices().await,
        Commands::Record {
            input,
            output,
            model,
            save,
        } => run_record(input, output, model, save).await,
        Commands::File { path, model } => run_file(&path, model).await,
        Commands::Download { url, model, save } => run_download(url, model, save).await,
    }
}
