mod cli;
mod runtime;

pub use runtime::{Ragd, RagdBuilder};

use clap::Parser;
use console::style;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    if let Err(e) = cli.execute().await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        std::process::exit(cli::exit_code(&e));
    }
}
