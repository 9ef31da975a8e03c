mod api;
mod autoupdate;
mod chain;
mod cli;
mod contracts;
mod feed;
mod ledger;
mod oracle;
mod state;

use clap::Parser;
use dotenvy::dotenv;
use std::process::ExitCode;

#[actix_web::main]
async fn main() -> ExitCode {
    let _ = dotenv();
    env_logger::init();

    let args = cli::Cli::parse();
    match cli::run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
