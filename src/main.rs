use std::process::ExitCode;

use clap::Parser;

use model_registry::{App, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let app = match App::bootstrap(cli.config.as_deref()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("model-registry: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.run(cli.resolved_command()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("model-registry: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
