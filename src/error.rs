//! Error types for the collector.
//!
//! `ClusterError` describes what went wrong talking to the cluster or to
//! `kubectl`. The remaining types add the context (kind, name, artifact,
//! path) needed to report a failed collection task.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ArtifactKind, ContainerDescriptor, ResourceKind};

const MISSING_PREVIOUS_CONTAINER: &str = "previous terminated container";

/// Failures coming back from the cluster API or an external command.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The API server answered with an error status
    #[error("Kubernetes API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Transport, config or decoding error from kube-rs
    #[error("Kubernetes client error: {0}")]
    Client(String),

    /// External command exited unsuccessfully
    #[error("{command} failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// External command could not be started
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading a log stream failed part way through
    #[error("log stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("failed to encode manifest: {0}")]
    Encode(String),

    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        operation: &'static str,
        kind: ResourceKind,
    },
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(status) => ClusterError::Api {
                code: status.code,
                message: status.message.clone(),
            },
            other => ClusterError::Client(other.to_string()),
        }
    }
}

impl ClusterError {
    /// True when a previous-log request failed only because the container
    /// never restarted.
    pub fn is_missing_previous_container(&self) -> bool {
        match self {
            ClusterError::Api { message, .. } => message.contains(MISSING_PREVIOUS_CONTAINER),
            ClusterError::Client(message) => message.contains(MISSING_PREVIOUS_CONTAINER),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to list {kind} in namespace {namespace}: {source}")]
pub struct ListError {
    pub kind: ResourceKind,
    pub namespace: String,
    #[source]
    pub source: ClusterError,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error getting spec of {kind}/{name}: {source}")]
    Manifest {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("error getting description of {kind}/{name}: {source}")]
    Description {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("error getting {artifact} for pod {}, container {}: {source}", .container.pod_name, .container.container_name)]
    Logs {
        container: ContainerDescriptor,
        artifact: ArtifactKind,
        #[source]
        source: ClusterError,
    },

    #[error("error getting {kind} list: {source}")]
    Inventory {
        kind: ResourceKind,
        #[source]
        source: ClusterError,
    },
}

#[derive(Debug, Error)]
#[error("error writing {}: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Terminal failure of a single collection task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("collection task aborted: {0}")]
    Panicked(String),
}

/// The bundle directory skeleton could not be created.
#[derive(Debug, Error)]
#[error("Error creating directory {}: {source}", .path.display())]
pub struct FilesystemError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error(
        "Px-backup not found. Please load the px-backup deployed kubeconfig and provide the namespace"
    )]
    NotFound,
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(
        "Set KUBECONFIG environment variable or provide the path to the kubeconfig file"
    )]
    Missing,
}

/// Failures that end a collection run before any task is launched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Layout(#[from] FilesystemError),

    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}
