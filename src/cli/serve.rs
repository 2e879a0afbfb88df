use crate::api;
use crate::backend::create_backend;
use crate::browser::{BrowseTarget, BrowserRegistry};
use crate::cli::commands::ServeArgs;
use crate::config::resolve_backend;
use crate::errors::GateError;
use crate::summary::{JobHistory, Qualifier};
use tracing::info;

pub async fn handle_serve(args: ServeArgs) -> Result<(), GateError> {
    let config = super::load_config(&args.common).await?;
    let backend_config = resolve_backend(&config, &super::overrides(&args.common))?;
    let (app_name, app_version) =
        super::app_identity(&config, args.app_name.as_ref(), args.app_version.as_ref());
    let (app_name, app_version) = match (app_name, app_version) {
        (Some(name), Some(version)) => (name, version),
        _ => return Err(GateError::Config("Application name and version are required to browse issues".into())),
    };
    let filter_set = args
        .filter_set
        .clone()
        .or_else(|| config.upload.as_ref().and_then(|u| u.filter_set.clone()));

    let backend = create_backend(&backend_config)?;
    let history = JobHistory::new(super::builds_dir(&args.common, &config));
    let registry = BrowserRegistry::new(
        backend,
        BrowseTarget {
            app_name: app_name.clone(),
            app_version: app_version.clone(),
            filter_set,
            page_size: backend_config.page_size,
        },
    )
    .with_history(history.clone());
    let state = api::create_app_state(registry, history, Qualifier::new(&app_name, &app_version));
    let app = api::build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    info!(host = %args.host, port = args.port, app = %app_name, version = %app_version, "Starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| GateError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
