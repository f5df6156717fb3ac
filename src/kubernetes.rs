use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use futures::io::{AsyncBufRead, AsyncReadExt};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolumeClaim, Pod, ResourceQuota, Service,
};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{ListParams, LogParams};
use kube::{Api, Client, ResourceExt};
use tokio::process::Command;
use tracing::debug;

use crate::error::ClusterError;
use crate::types::{ResourceInstance, ResourceKind};

/// Parameters of a single container log request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub pod: String,
    pub container: String,
    /// `None` requests the full log.
    pub tail_lines: Option<i64>,
    pub previous: bool,
}

/// Read-only view of the cluster used by the collector.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Current instances of `kind` in `namespace`.
    async fn list_instances(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<ResourceInstance>, ClusterError>;

    /// Re-applicable YAML manifest of one object.
    async fn manifest(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<String, ClusterError>;

    /// Human readable `kubectl describe` output of one object.
    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<String, ClusterError>;

    /// Tabular `kubectl get` listing of a resource type.
    async fn inventory(&self, kind: ResourceKind, namespace: &str) -> Result<String, ClusterError>;

    /// Raw bytes of one container log, read to the end of the stream.
    async fn container_logs(
        &self,
        namespace: &str,
        request: &LogRequest,
    ) -> Result<Vec<u8>, ClusterError>;

    /// Namespace of the first service called `service` in any namespace.
    async fn find_service_namespace(&self, service: &str) -> Result<Option<String>, ClusterError>;
}

/// [`ClusterReader`] backed by kube-rs, shelling out to `kubectl` for the
/// describe and inventory output that has no API equivalent.
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
    kubeconfig: Option<PathBuf>,
}

impl KubeClusterReader {
    pub fn new(client: Client, kubeconfig: Option<PathBuf>) -> Self {
        Self { client, kubeconfig }
    }

    async fn kubectl(&self, args: &[&str]) -> Result<String, ClusterError> {
        let command = format!("kubectl {}", args.join(" "));
        debug!("Running {}", command);

        let mut cmd = Command::new("kubectl");
        cmd.args(args);
        if let Some(path) = &self.kubeconfig {
            cmd.env("KUBECONFIG", path);
        }

        let output = cmd.output().await.map_err(|source| ClusterError::Spawn {
            command: command.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(ClusterError::Command {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

async fn list_objects_generic<T>(client: &Client, namespace: &str) -> Result<Vec<T>, ClusterError>
where
    T: k8s_openapi::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>
        + serde::de::DeserializeOwned
        + Clone
        + Debug
        + Send
        + Sync,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;
    Ok(list.items)
}

async fn list_instances_generic<T>(
    client: &Client,
    kind: ResourceKind,
    namespace: &str,
) -> Result<Vec<ResourceInstance>, ClusterError>
where
    T: k8s_openapi::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>
        + serde::de::DeserializeOwned
        + Clone
        + Debug
        + Send
        + Sync,
{
    Ok(list_objects_generic::<T>(client, namespace)
        .await?
        .iter()
        .map(|obj| ResourceInstance::new(kind, obj.name_any(), namespace))
        .collect())
}

async fn manifest_generic<T>(
    client: &Client,
    name: &str,
    namespace: &str,
) -> Result<String, ClusterError>
where
    T: k8s_openapi::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>
        + serde::de::DeserializeOwned
        + serde::Serialize
        + Clone
        + Debug
        + Send
        + Sync,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let obj = api.get(name).await?;
    serde_yaml::to_string(&obj).map_err(|e| ClusterError::Encode(e.to_string()))
}

/// Read a log stream to exhaustion. End of stream is success no matter how
/// many reads it took; any other read error is returned. Bytes are kept as
/// the container emitted them.
pub async fn drain_log<R: AsyncBufRead>(stream: R) -> Result<Vec<u8>, ClusterError> {
    let mut stream = Box::pin(stream);
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(buf)
}

fn pod_instance(pod: &Pod, namespace: &str) -> ResourceInstance {
    let name = pod.name_any();
    let (init, main) = pod
        .spec
        .as_ref()
        .map(|spec| {
            let init = spec
                .init_containers
                .iter()
                .flatten()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>();
            let main = spec
                .containers
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>();
            (init, main)
        })
        .unwrap_or_default();
    ResourceInstance::pod(&name, namespace, init, main)
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn list_instances(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<ResourceInstance>, ClusterError> {
        let client = &self.client;
        match kind {
            ResourceKind::Pod => Ok(list_objects_generic::<Pod>(client, namespace)
                .await?
                .iter()
                .map(|pod| pod_instance(pod, namespace))
                .collect()),
            ResourceKind::Job => list_instances_generic::<Job>(client, kind, namespace).await,
            ResourceKind::ConfigMap => {
                list_instances_generic::<ConfigMap>(client, kind, namespace).await
            }
            ResourceKind::ResourceQuota => {
                list_instances_generic::<ResourceQuota>(client, kind, namespace).await
            }
            ResourceKind::StatefulSet => {
                list_instances_generic::<StatefulSet>(client, kind, namespace).await
            }
            ResourceKind::Deployment => {
                list_instances_generic::<Deployment>(client, kind, namespace).await
            }
            ResourceKind::NetworkPolicy => {
                list_instances_generic::<NetworkPolicy>(client, kind, namespace).await
            }
            ResourceKind::PersistentVolumeClaim => {
                list_instances_generic::<PersistentVolumeClaim>(client, kind, namespace).await
            }
            ResourceKind::Prometheus | ResourceKind::Alertmanager => {
                Err(ClusterError::Unsupported {
                    operation: "instance listing",
                    kind,
                })
            }
        }
    }

    async fn manifest(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<String, ClusterError> {
        let client = &self.client;
        match kind {
            ResourceKind::Pod => manifest_generic::<Pod>(client, name, namespace).await,
            ResourceKind::Job => manifest_generic::<Job>(client, name, namespace).await,
            ResourceKind::ConfigMap => manifest_generic::<ConfigMap>(client, name, namespace).await,
            ResourceKind::ResourceQuota => {
                manifest_generic::<ResourceQuota>(client, name, namespace).await
            }
            ResourceKind::StatefulSet => {
                manifest_generic::<StatefulSet>(client, name, namespace).await
            }
            ResourceKind::Deployment => {
                manifest_generic::<Deployment>(client, name, namespace).await
            }
            ResourceKind::NetworkPolicy => {
                manifest_generic::<NetworkPolicy>(client, name, namespace).await
            }
            ResourceKind::PersistentVolumeClaim => {
                manifest_generic::<PersistentVolumeClaim>(client, name, namespace).await
            }
            ResourceKind::Prometheus | ResourceKind::Alertmanager => {
                Err(ClusterError::Unsupported {
                    operation: "manifest retrieval",
                    kind,
                })
            }
        }
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<String, ClusterError> {
        self.kubectl(&["describe", kind.kubectl_name(), name, "-n", namespace])
            .await
    }

    async fn inventory(&self, kind: ResourceKind, namespace: &str) -> Result<String, ClusterError> {
        self.kubectl(&["get", kind.kubectl_name(), "-n", namespace])
            .await
    }

    async fn container_logs(
        &self,
        namespace: &str,
        request: &LogRequest,
    ) -> Result<Vec<u8>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = LogParams {
            container: Some(request.container.clone()),
            previous: request.previous,
            tail_lines: request.tail_lines,
            ..Default::default()
        };
        let stream = api.log_stream(&request.pod, &lp).await?;
        drain_log(stream).await
    }

    async fn find_service_namespace(&self, service: &str) -> Result<Option<String>, ClusterError> {
        let api: Api<Service> = Api::all(self.client.clone());
        let services = api.list(&ListParams::default()).await?;
        Ok(services
            .items
            .iter()
            .find(|svc| svc.name_any() == service)
            .and_then(|svc| svc.namespace()))
    }
}
