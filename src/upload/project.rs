use tracing::{info, warn};
use crate::backend::{IssueTemplate, NewVersionRequest, ResultsBackend};
use crate::errors::GateError;
use crate::models::{ProjectId, VersionId};

/// Requested template by name, else the server default, else the first one.
pub fn select_template(templates: &[IssueTemplate], requested: Option<&str>) -> Result<IssueTemplate, GateError> {
    if let Some(name) = requested {
        if let Some(t) = templates.iter().find(|t| t.name == name || t.id == name) {
            return Ok(t.clone());
        }
        warn!(template = name, "Issue template not found, using the default template");
    }
    templates
        .iter()
        .find(|t| t.default_template)
        .or_else(|| templates.first())
        .cloned()
        .ok_or_else(|| GateError::Backend("Server has no issue templates".into()))
}

/// Returns the id of the (app, version) pair, creating and committing it
/// first when the server does not know it yet.
pub async fn ensure_version(
    backend: &dyn ResultsBackend,
    app_name: &str,
    app_version: &str,
    template: Option<&str>,
) -> Result<VersionId, GateError> {
    let project_id: Option<ProjectId> = backend.resolve_project_id(app_name).await?;
    if let Some(project_id) = project_id {
        if let Some(version_id) = backend.resolve_version_id(project_id, app_version).await? {
            return Ok(version_id);
        }
    }

    let templates = backend.issue_templates().await?;
    let template = select_template(&templates, template)?;
    let request = NewVersionRequest {
        project_id,
        app_name: app_name.to_string(),
        app_version: app_version.to_string(),
        template,
    };
    let (project_id, version_id) = backend.create_project_or_version(&request).await?;
    backend.commit_version(version_id).await?;
    info!(%project_id, %version_id, app = app_name, version = app_version, "Created application version");
    Ok(version_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn template(id: &str, default: bool) -> IssueTemplate {
        IssueTemplate { id: id.into(), name: format!("{} name", id), default_template: default, master_attr_guid: None }
    }

    #[test]
    fn test_select_template_order() {
        let templates = vec![template("a", false), template("b", true)];
        assert_eq!(select_template(&templates, Some("a name")).unwrap().id, "a");
        assert_eq!(select_template(&templates, Some("missing")).unwrap().id, "b");
        assert_eq!(select_template(&templates, None).unwrap().id, "b");
        assert_eq!(select_template(&[template("c", false)], None).unwrap().id, "c");
        assert!(select_template(&[], None).is_err());
    }

    #[tokio::test]
    async fn test_ensure_version_is_idempotent() {
        let backend = MemoryBackend::new();
        let first = ensure_version(&backend, "billing", "2.1", None).await.unwrap();
        let second = ensure_version(&backend, "billing", "2.1", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.creations(), 1);
        assert_eq!(backend.commits(), 1);
        assert!(backend.version_committed(first));
    }

    #[tokio::test]
    async fn test_ensure_version_adds_version_to_existing_project() {
        let backend = MemoryBackend::new().with_version("billing", "1.0");
        let project = backend.resolve_project_id("billing").await.unwrap().unwrap();
        let version = ensure_version(&backend, "billing", "2.0", None).await.unwrap();
        assert_eq!(backend.resolve_version_id(project, "2.0").await.unwrap(), Some(version));
        assert_eq!(backend.resolve_project_id("billing").await.unwrap(), Some(project));
    }

    #[tokio::test]
    async fn test_existing_version_creates_nothing() {
        let backend = MemoryBackend::new().with_version("billing", "1.0");
        ensure_version(&backend, "billing", "1.0", None).await.unwrap();
        assert_eq!(backend.creations(), 0);
        assert_eq!(backend.commits(), 0);
    }
}
