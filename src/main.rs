use clap::Parser;

use papercast::cli::{run, Cli, RunOutcome};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(RunOutcome::Completed { failed: 0, .. }) => std::process::exit(0),
        Ok(RunOutcome::Completed { .. }) => std::process::exit(1),
        Ok(RunOutcome::NothingToDo) => std::process::exit(2),
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            std::process::exit(3);
        }
    }
}
