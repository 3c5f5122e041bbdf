mod cli_interface;
mod commands;
mod console;

use clap::Parser;
use dotenv::dotenv;

use crate::{
    cli_interface::{Commands, CLI},
    commands::{ingest::handle_ingest_command, status::handle_status_api_command},
    console::print_error_message,
};
use walletctx::Mode;

#[tokio::main]
async fn main() {
    dotenv().ok();
    walletctx::setup_info_logger();

    let cli = CLI::parse();

    let result = match cli.command {
        Commands::Backfill(args) => handle_ingest_command(Mode::Backfill, args).await,
        Commands::Delta(args) => handle_ingest_command(Mode::Delta, args).await,
        Commands::StatusApi { port, clickhouse_url } => {
            handle_status_api_command(port, clickhouse_url).await
        }
    };

    if let Err(error) = result {
        print_error_message(&format!("walletctx failed: {error}"));
        std::process::exit(1);
    }
}
