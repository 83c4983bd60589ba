use lockward::{App, ConfigBuilder};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ConfigBuilder::new().from_env().build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lockward: invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    lockward::init_tracing_with_config(&config);

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.serve().await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
