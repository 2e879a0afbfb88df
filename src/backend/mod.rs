pub mod client;
pub mod memory;
pub mod ssc;

pub use client::{GroupingQuery, IssueQuery, IssueTemplate, NewVersionRequest, ResultsBackend};
pub use memory::MemoryBackend;
pub use ssc::SscClient;

use std::sync::Arc;
use crate::config::BackendConfig;
use crate::errors::GateError;
use crate::models::{with_all_bucket, FolderBucket, VersionId};

pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn ResultsBackend>, GateError> {
    Ok(Arc::new(SscClient::new(config)?))
}

/// Folder buckets with the synthetic "All" bucket appended.
pub async fn fetch_buckets(
    backend: &dyn ResultsBackend,
    version_id: VersionId,
    filter_set: Option<&str>,
) -> Result<Vec<FolderBucket>, GateError> {
    let buckets = backend.list_folder_buckets(version_id, filter_set).await?;
    Ok(with_all_bucket(buckets))
}
