use std::sync::Arc;

use crate::error::FetchError;
use crate::kubernetes::{ClusterReader, LogRequest};
use crate::types::{ArtifactKind, ContainerDescriptor, ResourceKind};

/// Result of a log fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFetch {
    /// Log bytes exactly as the container wrote them.
    Log(Vec<u8>),
    /// The container has no previous terminated instance. Nothing to write.
    NoPreviousContainer,
}

/// Retrieves artifact text for single resource instances.
#[derive(Clone)]
pub struct ArtifactFetcher {
    reader: Arc<dyn ClusterReader>,
    namespace: String,
}

impl ArtifactFetcher {
    pub fn new(reader: Arc<dyn ClusterReader>, namespace: impl Into<String>) -> Self {
        Self {
            reader,
            namespace: namespace.into(),
        }
    }

    pub async fn fetch_spec(&self, kind: ResourceKind, name: &str) -> Result<String, FetchError> {
        self.reader
            .manifest(kind, name, &self.namespace)
            .await
            .map_err(|source| FetchError::Manifest {
                kind,
                name: name.to_string(),
                source,
            })
    }

    pub async fn fetch_description(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<String, FetchError> {
        self.reader
            .describe(kind, name, &self.namespace)
            .await
            .map_err(|source| FetchError::Description {
                kind,
                name: name.to_string(),
                source,
            })
    }

    pub async fn fetch_inventory(&self, kind: ResourceKind) -> Result<String, FetchError> {
        self.reader
            .inventory(kind, &self.namespace)
            .await
            .map_err(|source| FetchError::Inventory { kind, source })
    }

    /// Fetch the current or previous log of one container.
    ///
    /// `tail_lines <= 0` requests the whole log. A previous-log request for a
    /// container that never restarted yields [`LogFetch::NoPreviousContainer`]
    /// rather than an error.
    pub async fn fetch_logs(
        &self,
        container: &ContainerDescriptor,
        tail_lines: i64,
        previous: bool,
    ) -> Result<LogFetch, FetchError> {
        let request = LogRequest {
            pod: container.pod_name.clone(),
            container: container.container_name.clone(),
            tail_lines: (tail_lines > 0).then_some(tail_lines),
            previous,
        };
        let artifact = if previous {
            ArtifactKind::PreviousLog
        } else {
            ArtifactKind::CurrentLog
        };
        match self.reader.container_logs(&self.namespace, &request).await {
            Ok(bytes) => Ok(LogFetch::Log(bytes)),
            Err(err) if previous && err.is_missing_previous_container() => {
                Ok(LogFetch::NoPreviousContainer)
            }
            Err(source) => Err(FetchError::Logs {
                container: container.clone(),
                artifact,
                source,
            }),
        }
    }
}
