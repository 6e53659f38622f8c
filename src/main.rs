// src/main.rs

use parbuild::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        // A task failed: it has already printed its own diagnostics.
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("parbuild error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
