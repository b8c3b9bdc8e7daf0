// Periboard - host-side control tool for the periboard peripheral controller board
use clap::Parser;
use periboard::cli::args::Args;
use periboard::cli::commands::execute_command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(e) = execute_command(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
