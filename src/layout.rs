//! Deterministic on-disk layout of a diagnostics bundle.
//!
//! ```text
//! <root>/<kind>/spec/<name>.yaml          kinds with a description
//! <root>/<kind>/describe/<name>.txt
//! <root>/<kind>/<name>.yaml               spec-only kinds
//! <root>/logs/<pod>_<container>_<role>.log
//! <root>/logs-previous/<pod>_<container>_<role>.log
//! <root>/<resource>_list.txt
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::FilesystemError;
use crate::types::{ContainerDescriptor, ResourceKind, TaskTarget};

pub const BUNDLE_DIR_NAME: &str = "pxb-diags-output";
pub const DEFAULT_BUNDLE_ROOT: &str = "/tmp/pxb-diags-output";

const SPEC_DIR: &str = "spec";
const DESCRIBE_DIR: &str = "describe";
const LOGS_DIR: &str = "logs";
const PREVIOUS_LOGS_DIR: &str = "logs-previous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    root: PathBuf,
}

impl BundleLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bundle root for an optional `--output-dir`.
    pub fn for_output_dir(output_dir: Option<&Path>) -> Self {
        match output_dir {
            Some(dir) => Self::new(dir.join(BUNDLE_DIR_NAME)),
            None => Self::new(DEFAULT_BUNDLE_ROOT),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination of a task. Pure and collision free as long as names are
    /// unique within a kind.
    pub fn plan_path(&self, target: &TaskTarget) -> PathBuf {
        match target {
            TaskTarget::Spec { kind, name } => self.spec_path(*kind, name),
            TaskTarget::Description { kind, name } => self.description_path(*kind, name),
            TaskTarget::Log {
                container,
                previous,
            } => self.log_path(container, *previous),
            TaskTarget::Inventory(kind) => self.inventory_path(*kind),
        }
    }

    pub fn spec_path(&self, kind: ResourceKind, name: &str) -> PathBuf {
        let kind_dir = self.root.join(kind.dir_name());
        let file = format!("{name}.yaml");
        if kind.collects_description() {
            kind_dir.join(SPEC_DIR).join(file)
        } else {
            kind_dir.join(file)
        }
    }

    pub fn description_path(&self, kind: ResourceKind, name: &str) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(DESCRIBE_DIR)
            .join(format!("{name}.txt"))
    }

    /// Path of a current or previous container log.
    pub fn log_path(&self, container: &ContainerDescriptor, previous: bool) -> PathBuf {
        let dir = if previous { PREVIOUS_LOGS_DIR } else { LOGS_DIR };
        self.root.join(dir).join(format!(
            "{}_{}_{}.log",
            container.pod_name,
            container.container_name,
            container.role.file_suffix()
        ))
    }

    pub fn inventory_path(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(format!("{}_list.txt", kind.kubectl_name()))
    }

    /// Every directory a collection task may write into.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for kind in ResourceKind::COLLECTED {
            let kind_dir = self.root.join(kind.dir_name());
            if kind.collects_description() {
                dirs.push(kind_dir.join(SPEC_DIR));
                dirs.push(kind_dir.join(DESCRIBE_DIR));
            } else {
                dirs.push(kind_dir);
            }
        }
        dirs.push(self.root.join(LOGS_DIR));
        dirs.push(self.root.join(PREVIOUS_LOGS_DIR));
        dirs
    }

    /// Create the directory skeleton. Safe to call on an existing bundle.
    pub async fn ensure(&self) -> Result<(), FilesystemError> {
        for dir in self.directories() {
            tokio::fs::create_dir_all(&dir).await.map_err(|source| FilesystemError {
                path: dir.clone(),
                source,
            })?;
            debug!("Ensured bundle directory {}", dir.display());
        }
        Ok(())
    }
}
