use clap::Parser;
use scrapi_client::ScrapiError;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::args::Cli;
use cli::commands::dispatch;

/// Exit code for failures that did not come from the client library.
const INTERNAL_ERROR: i32 = 2;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.service.log_level.as_str());

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ScrapiError>()
        .map(ScrapiError::exit_code)
        .unwrap_or(INTERNAL_ERROR)
}
