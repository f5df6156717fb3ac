use std::fmt;
use std::path::PathBuf;

/// Class of cluster object tracked by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Job,
    Pod,
    ConfigMap,
    ResourceQuota,
    StatefulSet,
    Deployment,
    NetworkPolicy,
    PersistentVolumeClaim,
    Prometheus,
    Alertmanager,
}

impl ResourceKind {
    /// Kinds whose instances are enumerated and collected one by one.
    pub const COLLECTED: [ResourceKind; 8] = [
        ResourceKind::Pod,
        ResourceKind::Job,
        ResourceKind::ConfigMap,
        ResourceKind::ResourceQuota,
        ResourceKind::StatefulSet,
        ResourceKind::Deployment,
        ResourceKind::NetworkPolicy,
        ResourceKind::PersistentVolumeClaim,
    ];

    /// Kinds that only contribute a `<resource>_list.txt` inventory.
    pub const INVENTORIES: [ResourceKind; 3] = [
        ResourceKind::Pod,
        ResourceKind::Prometheus,
        ResourceKind::Alertmanager,
    ];

    /// Resource type name as understood by `kubectl`.
    pub fn kubectl_name(self) -> &'static str {
        match self {
            ResourceKind::Job => "job",
            ResourceKind::Pod => "pod",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::ResourceQuota => "resourcequota",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::Deployment => "deployment",
            ResourceKind::NetworkPolicy => "networkpolicy",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaim",
            ResourceKind::Prometheus => "prometheus",
            ResourceKind::Alertmanager => "alertmanager",
        }
    }

    /// Directory under the bundle root holding this kind's artifacts.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::PersistentVolumeClaim => "pvc",
            other => other.kubectl_name(),
        }
    }

    pub fn collects_description(self) -> bool {
        matches!(
            self,
            ResourceKind::Job
                | ResourceKind::Pod
                | ResourceKind::StatefulSet
                | ResourceKind::Deployment
                | ResourceKind::PersistentVolumeClaim
        )
    }

    pub fn collects_logs(self) -> bool {
        self == ResourceKind::Pod
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kubectl_name())
    }
}

/// One piece of collected output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Spec,
    Description,
    CurrentLog,
    PreviousLog,
    ResourceList,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::Spec => "spec",
            ArtifactKind::Description => "description",
            ArtifactKind::CurrentLog => "logs",
            ArtifactKind::PreviousLog => "previous logs",
            ArtifactKind::ResourceList => "list",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    Init,
    Main,
}

impl ContainerRole {
    /// Suffix used in log file names.
    pub fn file_suffix(self) -> &'static str {
        match self {
            ContainerRole::Init => "init-container",
            ContainerRole::Main => "container",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerDescriptor {
    pub pod_name: String,
    pub container_name: String,
    pub role: ContainerRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInstance {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    /// Init containers first, then main containers, each in cluster order.
    /// Always empty for kinds other than pods.
    pub containers: Vec<ContainerDescriptor>,
}

impl ResourceInstance {
    pub fn new(kind: ResourceKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            containers: Vec::new(),
        }
    }

    pub fn pod<I, M>(name: &str, namespace: &str, init: I, main: M) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let descriptor = |container: String, role: ContainerRole| ContainerDescriptor {
            pod_name: name.to_string(),
            container_name: container,
            role,
        };
        let containers = init
            .into_iter()
            .map(|c| descriptor(c.into(), ContainerRole::Init))
            .chain(
                main.into_iter()
                    .map(|c| descriptor(c.into(), ContainerRole::Main)),
            )
            .collect();
        Self {
            kind: ResourceKind::Pod,
            name: name.to_string(),
            namespace: namespace.to_string(),
            containers,
        }
    }
}

/// What a single collection task fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskTarget {
    Spec { kind: ResourceKind, name: String },
    Description { kind: ResourceKind, name: String },
    Log {
        container: ContainerDescriptor,
        previous: bool,
    },
    Inventory(ResourceKind),
}

impl TaskTarget {
    pub fn artifact(&self) -> ArtifactKind {
        match self {
            TaskTarget::Spec { .. } => ArtifactKind::Spec,
            TaskTarget::Description { .. } => ArtifactKind::Description,
            TaskTarget::Log { previous: false, .. } => ArtifactKind::CurrentLog,
            TaskTarget::Log { previous: true, .. } => ArtifactKind::PreviousLog,
            TaskTarget::Inventory(_) => ArtifactKind::ResourceList,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            TaskTarget::Spec { kind, .. } | TaskTarget::Description { kind, .. } => *kind,
            TaskTarget::Log { .. } => ResourceKind::Pod,
            TaskTarget::Inventory(kind) => *kind,
        }
    }
}

impl fmt::Display for TaskTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskTarget::Spec { kind, name } | TaskTarget::Description { kind, name } => {
                write!(f, "{} of {}/{}", self.artifact(), kind, name)
            }
            TaskTarget::Log { container, .. } => write!(
                f,
                "{} of pod {}, {} {}",
                self.artifact(),
                container.pod_name,
                container.role.file_suffix(),
                container.container_name
            ),
            TaskTarget::Inventory(kind) => write!(f, "{} list", kind),
        }
    }
}

/// One fetch-then-write unit of work. Runs exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTask {
    pub target: TaskTarget,
    pub path: PathBuf,
}
