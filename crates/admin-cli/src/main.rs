use std::process::ExitCode;

use admin_cli::{Cli, Config, telemetry};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env();
    telemetry::init(&config);

    match admin_cli::run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
