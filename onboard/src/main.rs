use clap::Parser;
use registrar::{Config, Onboard};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Exit codes
const EXIT_FATAL: u8 = 1;
const EXIT_PARTIAL_FAILURE: u8 = 2;

// Transport crates log every request at debug level
const QUIET_DEPENDENCIES: &str =
    "hyper=off,hyper_util=off,alloy_transport_http=off,reqwest=off,alloy_rpc_client=off";

fn main() -> ExitCode {
    let cli = Onboard::parse();

    // RUST_LOG takes precedence over --debug-level
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::builder().parse(format!("{},{QUIET_DEPENDENCIES}", cli.debug_level))
    });
    let filter = match filter {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Invalid log filter: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    let allow_failures = config.allow_failures;

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start the async runtime");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match runtime.block_on(registrar::run(config)) {
        Ok(report) if report.all_confirmed() => {
            info!("All validators registered");
            ExitCode::SUCCESS
        }
        Ok(_) if allow_failures => {
            warn!("Some validators were not registered, exiting successfully as requested");
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::from(EXIT_PARTIAL_FAILURE),
        Err(e) => {
            error!(error = %e, "Registration run failed");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
