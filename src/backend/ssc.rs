use std::path::Path;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use crate::config::BackendConfig;
use crate::errors::{with_retry, GateError, RetryConfig};
use crate::models::{
    ArtifactId, ArtifactStatus, FolderBucket, GroupingValue, IssueRow, ProjectId, VersionId,
};
use crate::utils::truncation::truncate_error;
use super::client::{GroupingQuery, IssueQuery, IssueTemplate, NewVersionRequest, ResultsBackend};

/// Grouping type that splits a folder into new/updated/removed issues.
const NEW_ISSUE_GROUPING: &str = "11111111-1111-1111-1111-111111111167";
const NEW_ISSUE_GROUP_ID: &str = "NEW";
/// Value written into required text attributes that have no default.
const ATTRIBUTE_PLACEHOLDER: &str = "changeme";

/// REST client for a Fortify Software Security Center instance.
pub struct SscClient {
    client: Client,
    server_url: String,
    api_url: String,
    auth_header: String,
    retry: RetryConfig,
}

impl SscClient {
    pub fn new(config: &BackendConfig) -> Result<Self, GateError> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let total = [config.read_timeout, config.write_timeout]
            .into_iter()
            .flatten()
            .max();
        if let Some(timeout) = total {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &config.proxy {
            let mut p = reqwest::Proxy::all(format!("http://{}:{}", proxy.host, proxy.port))
                .map_err(|e| GateError::Config(format!("Invalid proxy: {}", e)))?;
            if let Some(user) = &proxy.username {
                p = p.basic_auth(user, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(p);
        }
        let client = builder
            .build()
            .map_err(|e| GateError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server_url: config.url.clone(),
            api_url: format!("{}/api/v1", config.url),
            auth_header: format!(
                "FortifyToken {}",
                data_encoding::BASE64.encode(config.token.as_bytes())
            ),
            retry: RetryConfig::default(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.api_url, path))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    async fn send(&self, what: &str, request: RequestBuilder) -> Result<Value, GateError> {
        let resp = request
            .send()
            .await
            .map_err(|e| GateError::Network(format!("{} request failed: {}", what, e)))?;
        let resp = check_status(what, resp).await?;
        resp.json().await
            .map_err(|e| GateError::Backend(format!("Failed to parse {} response: {}", what, e)))
    }

    /// GET with retry on transient failures.
    async fn get(&self, what: &str, path: &str, query: &[(&str, String)]) -> Result<Value, GateError> {
        debug!(path, "GET");
        with_retry(what, &self.retry, || {
            self.send(what, self.request(Method::GET, path).query(query))
        }).await
    }

    async fn filter_sets(&self, version_id: VersionId) -> Result<Vec<Value>, GateError> {
        let data = self
            .get("filter sets", &format!("projectVersions/{}/filterSets", version_id), &[])
            .await?;
        Ok(data_array(&data))
    }

    /// Map a filter set title or guid onto the guid the server expects.
    async fn resolve_filter_set(
        &self,
        version_id: VersionId,
        requested: Option<&str>,
    ) -> Result<Option<String>, GateError> {
        let Some(requested) = requested else { return Ok(None) };
        let sets = self.filter_sets(version_id).await?;
        let guid = sets
            .iter()
            .find(|s| s["title"].as_str() == Some(requested) || s["guid"].as_str() == Some(requested))
            .and_then(|s| s["guid"].as_str())
            .unwrap_or(requested);
        Ok(Some(guid.to_string()))
    }

    async fn grouping_guid(&self, version_id: VersionId, display_name: &str) -> Result<String, GateError> {
        let data = self
            .get("issue selectors", &format!("projectVersions/{}/issueSelectorSet", version_id), &[])
            .await?;
        data["data"]["groupBySet"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|g| g["displayName"].as_str() == Some(display_name))
            .and_then(|g| g["guid"].as_str().or_else(|| g["value"].as_str()))
            .map(str::to_string)
            .ok_or_else(|| GateError::NotFound(format!("Grouping '{}' is not available", display_name)))
    }

    async fn new_issue_count(
        &self,
        version_id: VersionId,
        folder_id: &str,
        filter_set: &str,
    ) -> Result<u32, GateError> {
        let data = self
            .get(
                "new issue groups",
                &format!("projectVersions/{}/issueGroups", version_id),
                &[
                    ("filter", format!("FOLDER:{}", folder_id)),
                    ("groupingtype", NEW_ISSUE_GROUPING.to_string()),
                    ("filterset", filter_set.to_string()),
                    ("qm", "issues".to_string()),
                    ("start", "0".to_string()),
                    ("limit", "-1".to_string()),
                ],
            )
            .await?;
        Ok(data_array(&data)
            .iter()
            .find(|g| {
                g["id"].as_str().is_some_and(|id| id.eq_ignore_ascii_case(NEW_ISSUE_GROUP_ID))
                    || g["cleanName"].as_str().is_some_and(|n| n.eq_ignore_ascii_case(NEW_ISSUE_GROUP_ID))
            })
            .map(|g| count_of(&g["totalCount"]))
            .unwrap_or(0))
    }

    async fn set_required_attributes(&self, version_id: VersionId) -> Result<(), GateError> {
        let data = self
            .get(
                "attribute definitions",
                "attributeDefinitions",
                &[
                    ("q", "required:true".to_string()),
                    ("start", "0".to_string()),
                    ("limit", "-1".to_string()),
                ],
            )
            .await?;

        let mut attributes = Vec::new();
        for def in data_array(&data) {
            if def["hasDefault"].as_bool().unwrap_or(false) {
                continue;
            }
            let Some(def_id) = def["id"].as_u64() else { continue };
            match def["type"].as_str().unwrap_or_default() {
                "TEXT" | "LONG_TEXT" | "SENSITIVE_TEXT" => attributes.push(json!({
                    "attributeDefinitionId": def_id,
                    "value": ATTRIBUTE_PLACEHOLDER,
                })),
                "SINGLE" | "MULTIPLE" => {
                    if let Some(guid) = def["options"][0]["guid"].as_str() {
                        attributes.push(json!({
                            "attributeDefinitionId": def_id,
                            "values": [{ "guid": guid }],
                        }));
                    }
                }
                other => warn!(attribute = %def["name"], kind = other, "Cannot default required attribute"),
            }
        }

        if attributes.is_empty() {
            return Ok(());
        }
        self.send(
            "version attributes",
            self.request(Method::PUT, &format!("projectVersions/{}/attributes", version_id))
                .json(&Value::Array(attributes)),
        ).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultsBackend for SscClient {
    async fn resolve_project_id(&self, app_name: &str) -> Result<Option<ProjectId>, GateError> {
        let data = self
            .get(
                "projects",
                "projects",
                &[
                    ("q", format!("name:\"{}\"", app_name)),
                    ("fulltextsearch", "false".to_string()),
                    ("start", "0".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(data_array(&data)
            .iter()
            .find(|p| p["name"].as_str() == Some(app_name))
            .and_then(|p| p["id"].as_u64())
            .map(ProjectId))
    }

    async fn resolve_version_id(
        &self,
        project_id: ProjectId,
        app_version: &str,
    ) -> Result<Option<VersionId>, GateError> {
        let data = self
            .get(
                "project versions",
                &format!("projects/{}/versions", project_id),
                &[
                    ("q", format!("name:\"{}\"", app_version)),
                    ("start", "0".to_string()),
                    ("limit", "-1".to_string()),
                ],
            )
            .await?;
        Ok(data_array(&data)
            .iter()
            .find(|v| v["name"].as_str() == Some(app_version))
            .and_then(|v| v["id"].as_u64())
            .map(VersionId))
    }

    async fn issue_templates(&self) -> Result<Vec<IssueTemplate>, GateError> {
        let data = self
            .get(
                "issue templates",
                "issueTemplates",
                &[("start", "0".to_string()), ("limit", "-1".to_string())],
            )
            .await?;
        Ok(data_array(&data)
            .iter()
            .filter_map(|t| {
                Some(IssueTemplate {
                    id: t["id"].as_str()?.to_string(),
                    name: t["name"].as_str().unwrap_or_default().to_string(),
                    default_template: t["defaultTemplate"].as_bool().unwrap_or(false),
                    master_attr_guid: t["masterAttrGuid"].as_str().map(str::to_string),
                })
            })
            .collect())
    }

    async fn create_project_or_version(
        &self,
        request: &NewVersionRequest,
    ) -> Result<(ProjectId, VersionId), GateError> {
        let mut body = json!({
            "name": request.app_version,
            "description": "",
            "active": true,
            "committed": false,
            "issueTemplateId": request.template.id,
            "masterAttrGuid": request.template.master_attr_guid,
        });
        let path = match request.project_id {
            Some(project_id) => format!("projects/{}/versions", project_id),
            None => {
                body["project"] = json!({
                    "name": request.app_name,
                    "description": "",
                    "issueTemplateId": request.template.id,
                });
                "projectVersions".to_string()
            }
        };

        info!(app = %request.app_name, version = %request.app_version, "Creating application version");
        let data = self
            .send("create version", self.request(Method::POST, &path).json(&body))
            .await?;
        let version_id = data["data"]["id"]
            .as_u64()
            .map(VersionId)
            .ok_or_else(|| GateError::Backend("Version id missing from create response".into()))?;
        let project_id = data["data"]["project"]["id"]
            .as_u64()
            .map(ProjectId)
            .or(request.project_id)
            .ok_or_else(|| GateError::Backend("Project id missing from create response".into()))?;
        Ok((project_id, version_id))
    }

    async fn commit_version(&self, version_id: VersionId) -> Result<(), GateError> {
        self.set_required_attributes(version_id).await?;
        self.send(
            "commit version",
            self.request(Method::PUT, &format!("projectVersions/{}", version_id))
                .json(&json!({ "committed": true })),
        ).await?;
        Ok(())
    }

    async fn upload_artifact(&self, version_id: VersionId, file: &Path) -> Result<ArtifactId, GateError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results.fpr".to_string());
        info!(file = %file.display(), size = bytes.len(), "Uploading results file");

        // Multipart bodies are not replayable, so no retry here.
        let form = Form::new().part(
            "file",
            Part::bytes(bytes).file_name(file_name),
        );
        let data = self
            .send(
                "upload artifact",
                self.request(Method::POST, &format!("projectVersions/{}/artifacts", version_id))
                    .multipart(form),
            )
            .await?;
        data["data"]["id"]
            .as_u64()
            .map(ArtifactId)
            .ok_or_else(|| GateError::Backend("Artifact id missing from upload response".into()))
    }

    async fn artifact_status(&self, artifact_id: ArtifactId) -> Result<ArtifactStatus, GateError> {
        let data = self
            .get("artifact", &format!("artifacts/{}", artifact_id), &[])
            .await?;
        let status = data["data"]["status"]
            .as_str()
            .ok_or_else(|| GateError::Backend("Artifact status missing from response".into()))?;
        Ok(ArtifactStatus::from_wire(status))
    }

    async fn list_folder_buckets(
        &self,
        version_id: VersionId,
        filter_set: Option<&str>,
    ) -> Result<Vec<FolderBucket>, GateError> {
        let sets = self.filter_sets(version_id).await?;
        let default_set = sets
            .iter()
            .find(|s| s["defaultFilterSet"].as_bool().unwrap_or(false))
            .or_else(|| sets.first())
            .ok_or_else(|| GateError::NotFound(format!("No filter sets for version {}", version_id)))?;
        let selected = filter_set
            .and_then(|wanted| {
                sets.iter().find(|s| {
                    s["title"].as_str() == Some(wanted) || s["guid"].as_str() == Some(wanted)
                })
            })
            .unwrap_or(default_set);
        let filter_guid = selected["guid"].as_str().unwrap_or_default().to_string();

        let catalog = self
            .get("folders", &format!("projectVersions/{}/folders", version_id), &[])
            .await?;
        let catalog = data_array(&catalog);

        let groups = self
            .get(
                "folder groups",
                &format!("projectVersions/{}/issueGroups", version_id),
                &[
                    ("groupingtype", "FOLDER".to_string()),
                    ("filterset", filter_guid.clone()),
                    ("qm", "issues".to_string()),
                    ("showshortfilenames", "true".to_string()),
                    ("start", "0".to_string()),
                    ("limit", "-1".to_string()),
                ],
            )
            .await?;
        let groups = data_array(&groups);

        let mut buckets = Vec::new();
        for folder in selected["folders"].as_array().into_iter().flatten() {
            let Some(guid) = folder["guid"].as_str() else { continue };
            let meta = catalog.iter().find(|c| c["guid"].as_str() == Some(guid)).unwrap_or(folder);
            let name = meta["name"].as_str().unwrap_or_default().to_string();
            let total = groups
                .iter()
                .find(|g| g["cleanName"].as_str() == Some(name.as_str()) || g["id"].as_str() == Some(guid))
                .map(|g| count_of(&g["totalCount"]))
                .unwrap_or(0);
            let new_count = if total == 0 {
                0
            } else {
                self.new_issue_count(version_id, guid, &filter_guid).await?
            };

            let mut bucket = FolderBucket::new(guid, &name, total, new_count);
            bucket.description = meta["description"].as_str().unwrap_or_default().to_string();
            bucket.color = meta["color"].as_str().unwrap_or_default().to_string();
            buckets.push(bucket);
        }
        Ok(buckets)
    }

    async fn grouping_values(&self, query: &GroupingQuery) -> Result<Vec<GroupingValue>, GateError> {
        let grouping = self.grouping_guid(query.version_id, &query.grouping).await?;
        let filter_set = self.resolve_filter_set(query.version_id, query.filter_set.as_deref()).await?;

        let mut params = vec![
            ("filter", format!("FOLDER:{}", query.folder_id)),
            ("groupingtype", grouping),
            ("qm", "issues".to_string()),
            ("showshortfilenames", "true".to_string()),
            ("start", "0".to_string()),
            ("limit", "-1".to_string()),
        ];
        if let Some(fs) = filter_set {
            params.push(("filterset", fs));
        }
        if let Some(condition) = &query.condition {
            params.push(("q", condition.clone()));
        }

        let data = self
            .get(
                "grouping values",
                &format!("projectVersions/{}/issueGroups", query.version_id),
                &params,
            )
            .await?;
        Ok(data_array(&data)
            .iter()
            .map(|g| {
                let id = g["id"].as_str().unwrap_or_default();
                let name = g["name"].as_str().or_else(|| g["cleanName"].as_str()).unwrap_or(id);
                let mut value = GroupingValue::new(id, name, &query.folder_id, count_of(&g["totalCount"]));
                value.visible_count = count_of(&g["visibleCount"]);
                value.audited_count = count_of(&g["auditedCount"]);
                value
            })
            .collect())
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<IssueRow>, GateError> {
        let filter_set = self.resolve_filter_set(query.version_id, query.filter_set.as_deref()).await?;
        let order_by = if query.descending {
            format!("-{}", query.order_by)
        } else {
            query.order_by.clone()
        };

        let mut params = vec![
            ("start", query.start.to_string()),
            ("limit", query.limit.map_or("-1".to_string(), |l| l.to_string())),
            ("filter", format!("FOLDER:{}", query.folder_id)),
            ("orderby", order_by),
            ("showhidden", "false".to_string()),
            ("showremoved", "false".to_string()),
            ("showsuppressed", "false".to_string()),
            ("showshortfilenames", "false".to_string()),
        ];
        if let Some(fs) = filter_set {
            params.push(("filterset", fs));
        }
        if let Some(grouping) = &query.grouping {
            match self.grouping_guid(query.version_id, grouping).await {
                Ok(guid) => params.push(("groupingtype", guid)),
                Err(e) => debug!(grouping = %grouping, error = %e, "Listing issues ungrouped"),
            }
        }
        if query.new_only {
            params.push(("qm", "issues".to_string()));
            params.push(("q", "[issue age]:new".to_string()));
        }

        let data = self
            .get("issues", &format!("projectVersions/{}/issues", query.version_id), &params)
            .await?;
        Ok(data_array(&data)
            .iter()
            .map(|i| IssueRow {
                version_id: query.version_id,
                issue_id: i["id"].as_u64().unwrap_or_default(),
                instance_id: text_of(&i["issueInstanceId"]),
                file_path: text_of(&i["fullFileName"]),
                line_number: count_of(&i["lineNumber"]),
                category: text_of(&i["issueName"]),
                severity: text_of(&i["friority"]),
                confidence: text_of(&i["confidence"]),
                engine_type: text_of(&i["engineType"]),
            })
            .collect())
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn backend_name(&self) -> &str {
        "ssc"
    }
}

async fn check_status(what: &str, resp: Response) -> Result<Response, GateError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = format!("{} returned {}: {}", what, status.as_u16(), truncate_error(&body));
    match status.as_u16() {
        401 | 403 => Err(GateError::Authentication(detail)),
        404 => Err(GateError::NotFound(detail)),
        502..=504 => Err(GateError::Network(detail)),
        _ => Err(GateError::Backend(detail)),
    }
}

fn data_array(value: &Value) -> Vec<Value> {
    value["data"].as_array().cloned().unwrap_or_default()
}

fn count_of(value: &Value) -> u32 {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_header_is_base64_token() {
        let client = SscClient::new(&BackendConfig::new("https://ssc.example/ssc", "secret")).unwrap();
        assert_eq!(client.auth_header, "FortifyToken c2VjcmV0");
        assert_eq!(client.api_url, "https://ssc.example/ssc/api/v1");
        assert_eq!(client.server_url(), "https://ssc.example/ssc");
    }

    #[test]
    fn test_invalid_config_rejected_before_network() {
        let result = SscClient::new(&BackendConfig::new("", "secret"));
        assert!(matches!(result, Err(GateError::Config(_))));
    }

    #[test]
    fn test_count_of_accepts_numbers_and_strings() {
        assert_eq!(count_of(&json!(12)), 12);
        assert_eq!(count_of(&json!("7")), 7);
        assert_eq!(count_of(&json!(null)), 0);
    }

    #[test]
    fn test_data_array_missing() {
        assert!(data_array(&json!({"count": 0})).is_empty());
        assert_eq!(data_array(&json!({"data": [1, 2]})).len(), 2);
    }

    #[test]
    fn test_text_of() {
        assert_eq!(text_of(&json!("a")), "a");
        assert_eq!(text_of(&json!(3.5)), "3.5");
        assert_eq!(text_of(&json!(null)), "");
    }
}
