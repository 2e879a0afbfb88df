use std::sync::Arc;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::backend::create_backend;
use crate::cli::commands::UploadArgs;
use crate::config::{resolve_backend, resolve_scoring, resolve_upload, CliOverrides};
use crate::errors::GateError;
use crate::pipeline::UploadStep;
use crate::summary::BuildResult;
use crate::utils::formatting::format_score;

pub const EXIT_UNSTABLE: i32 = 6;

/// Run one upload step. Returns the process exit code.
pub async fn handle_upload(args: UploadArgs) -> Result<i32, GateError> {
    let config = super::load_config(&args.common).await?;
    let overrides = CliOverrides {
        app_name: args.app_name.clone(),
        app_version: args.app_version.clone(),
        results_file: args.results.clone(),
        results_remote: args.remote,
        filter_set: args.filter_set.clone(),
        failure_condition: args.failure_condition.clone(),
        timeout_minutes: args.timeout,
        poll_interval_minutes: args.poll_interval,
        ..super::overrides(&args.common)
    };

    let upload = resolve_upload(&config, &overrides)?;
    let backend_config = resolve_backend(&config, &overrides)?;
    let backend = create_backend(&backend_config)?;
    let builds_dir = super::builds_dir(&args.common, &config);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            ctrl_c_token.cancel();
        }
    });

    let mut step = UploadStep::new(
        Arc::clone(&backend),
        backend_config,
        upload,
        resolve_scoring(&config),
        builds_dir,
    )
    .with_cancel_token(cancel_token);
    if let Some(number) = args.build_number {
        step = step.with_build_number(number);
    }

    let outcome = step.run().await?;
    println!(
        "{} build #{} ({}): score {}, {} issue(s), {} matching the failure condition",
        style("\u{2714}").green().bold(),
        outcome.build,
        outcome.qualifier,
        style(format_score(outcome.summary.score)).bold(),
        outcome.summary.total_issues,
        outcome.summary.failed_count,
    );

    if outcome.result == BuildResult::Unstable {
        println!(
            "{} build marked unstable",
            style("\u{26a0}").yellow(),
        );
        if args.fail_on_unstable {
            return Ok(EXIT_UNSTABLE);
        }
    }
    info!(build = outcome.build, result = %outcome.result, "Upload step finished");
    Ok(0)
}
