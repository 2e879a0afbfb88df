use clap::Parser;
use findings_gate::{cli, config, errors::GateError, version_info};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();
    debug!(version = %version_info(), "findings-gate starting");

    let result = match cli.command {
        cli::Commands::Upload(args) => cli::upload::handle_upload(args).await,
        cli::Commands::Serve(args) => cli::serve::handle_serve(args).await.map(|_| 0),
        cli::Commands::Trend(args) => cli::report::handle_trend(args).await.map(|_| 0),
        cli::Commands::History(args) => cli::report::handle_history(args).await.map(|_| 0),
        cli::Commands::Validate(args) => handle_validate(args).await.map(|_| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn exit_code(e: &GateError) -> i32 {
    match e {
        GateError::Config(_) => 2,
        GateError::Processing(_) => 3,
        GateError::Timeout(_) => 4,
        GateError::Authentication(_) => 5,
        _ => 1,
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), GateError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
