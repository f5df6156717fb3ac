//! Collection orchestrator.
//!
//! A run moves through `Planning -> Discovering -> Collecting -> Draining ->
//! Done`. Only planning (directory skeleton) and namespace resolution can
//! end a run early. Every other failure is recorded on the task or kind it
//! belongs to and the run carries on.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{ListError, RunError, TaskError};
use crate::fetcher::{ArtifactFetcher, LogFetch};
use crate::kubernetes::ClusterReader;
use crate::layout::BundleLayout;
use crate::namespace::resolve_namespace;
use crate::types::{CollectionTask, ResourceInstance, ResourceKind, TaskTarget};
use crate::writer::write_artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Discovering,
    Collecting,
    Draining,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSettings {
    /// Lines to keep from the end of each log; `<= 0` keeps everything.
    pub tail_lines: i64,
    /// Maximum tasks fetching or writing at once; `0` means no limit.
    pub max_concurrency: usize,
}

/// Snapshot of the instances found in the target namespace.
#[derive(Debug, Default)]
pub struct Inventory {
    pub instances: Vec<ResourceInstance>,
    pub failures: Vec<ListError>,
}

#[derive(Debug)]
pub enum TaskStatus {
    Written { bytes: usize },
    /// Nothing to collect, e.g. a container that never restarted.
    Skipped,
    Failed(TaskError),
}

#[derive(Debug)]
pub struct TaskOutcome {
    pub task: CollectionTask,
    pub status: TaskStatus,
}

#[derive(Debug)]
pub struct CollectionReport {
    pub bundle_root: PathBuf,
    pub namespace: String,
    /// One entry per launched task, ordered by output path.
    pub outcomes: Vec<TaskOutcome>,
    pub list_failures: Vec<ListError>,
}

impl CollectionReport {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Failed(_)))
    }

    pub fn bytes_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TaskStatus::Written { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// Failed tasks and their errors, in path order.
    pub fn failures(&self) -> impl Iterator<Item = (&CollectionTask, &TaskError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            TaskStatus::Failed(err) => Some((&o.task, err)),
            _ => None,
        })
    }

    /// Number of failed tasks per resource kind.
    pub fn failures_by_kind(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for (task, _) in self.failures() {
            *counts.entry(task.target.kind()).or_insert(0) += 1;
        }
        counts
    }

    fn count(&self, pred: impl Fn(&TaskStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

pub struct Collector {
    reader: Arc<dyn ClusterReader>,
    layout: BundleLayout,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(
        reader: Arc<dyn ClusterReader>,
        layout: BundleLayout,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            reader,
            layout,
            settings,
        }
    }

    /// Run a full collection. Returns once every launched task has finished.
    pub async fn run(&self, namespace: Option<&str>) -> Result<CollectionReport, RunError> {
        enter(Phase::Planning);
        self.layout.ensure().await?;

        enter(Phase::Discovering);
        let namespace = resolve_namespace(self.reader.as_ref(), namespace).await?;
        info!("Collecting diagnostics from namespace {}", namespace);
        let inventory = self.discover(&namespace).await;

        enter(Phase::Collecting);
        let tasks = self.plan(&inventory);
        info!(
            "Launching {} collection tasks for {} resources",
            tasks.len(),
            inventory.instances.len()
        );
        let outcomes = self.execute(&namespace, tasks).await;

        let report = CollectionReport {
            bundle_root: self.layout.root().to_path_buf(),
            namespace,
            outcomes,
            list_failures: inventory.failures,
        };
        enter(Phase::Done);
        info!(
            "Collection of {} finished: {} written ({} bytes), {} skipped, {} failed, {} kinds not listed",
            report.namespace,
            report.written(),
            report.bytes_written(),
            report.skipped(),
            report.failed(),
            report.list_failures.len()
        );
        for (kind, count) in report.failures_by_kind() {
            warn!("{} {} artifacts could not be collected", count, kind);
        }
        for (task, err) in report.failures() {
            debug!("{}: {}", task.path.display(), err);
        }
        Ok(report)
    }

    /// List every collected kind once, in order. A failed kind is recorded
    /// and skipped.
    pub async fn discover(&self, namespace: &str) -> Inventory {
        let mut inventory = Inventory::default();
        for kind in ResourceKind::COLLECTED {
            match self.reader.list_instances(kind, namespace).await {
                Ok(found) => {
                    debug!("Found {} {} instances", found.len(), kind);
                    inventory.instances.extend(found);
                }
                Err(source) => {
                    let err = ListError {
                        kind,
                        namespace: namespace.to_string(),
                        source,
                    };
                    error!("{}", err);
                    inventory.failures.push(err);
                }
            }
        }
        inventory
    }

    /// Expand an inventory into independent tasks: spec (and description
    /// where the kind has one) per instance, current and previous log per pod
    /// container, plus the standalone resource lists.
    pub fn plan(&self, inventory: &Inventory) -> Vec<CollectionTask> {
        let mut targets = Vec::new();

        for instance in &inventory.instances {
            let kind = instance.kind;
            targets.push(TaskTarget::Spec {
                kind,
                name: instance.name.clone(),
            });
            if kind.collects_description() {
                targets.push(TaskTarget::Description {
                    kind,
                    name: instance.name.clone(),
                });
            }
            if kind.collects_logs() {
                for previous in [false, true] {
                    targets.extend(instance.containers.iter().map(|c| TaskTarget::Log {
                        container: c.clone(),
                        previous,
                    }));
                }
            }
        }

        targets.extend(ResourceKind::INVENTORIES.map(TaskTarget::Inventory));

        targets
            .into_iter()
            .map(|target| CollectionTask {
                path: self.layout.plan_path(&target),
                target,
            })
            .collect()
    }

    /// Run every task on the worker pool and wait for all of them.
    pub async fn execute(&self, namespace: &str, tasks: Vec<CollectionTask>) -> Vec<TaskOutcome> {
        let limit = match self.settings.max_concurrency {
            0 => Semaphore::MAX_PERMITS,
            n => n,
        };
        let semaphore = Arc::new(Semaphore::new(limit));
        let fetcher = ArtifactFetcher::new(self.reader.clone(), namespace);
        let tail_lines = self.settings.tail_lines;

        let mut join_set = JoinSet::new();
        let mut pending = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let sem = semaphore.clone();
            let fetcher = fetcher.clone();
            let spawned = task.clone();
            let handle = join_set.spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                let status = run_task(&fetcher, &spawned, tail_lines).await;
                TaskOutcome {
                    task: spawned,
                    status,
                }
            });
            pending.insert(handle.id(), task);
        }

        enter(Phase::Draining);
        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    outcomes.push(outcome);
                }
                Err(e) => {
                    let Some(task) = pending.remove(&e.id()) else {
                        error!("Collection task failed: {}", e);
                        continue;
                    };
                    let err = TaskError::Panicked(e.to_string());
                    error!("Error collecting {}: {}", task.target, err);
                    outcomes.push(TaskOutcome {
                        task,
                        status: TaskStatus::Failed(err),
                    });
                }
            }
        }

        outcomes.sort_by(|a, b| a.task.path.cmp(&b.task.path));
        outcomes
    }
}

fn enter(phase: Phase) {
    debug!("Collector phase: {}", phase);
}

/// Fetch then write. Returns `Ok(None)` when there is nothing to write.
async fn collect_one(
    fetcher: &ArtifactFetcher,
    task: &CollectionTask,
    tail_lines: i64,
) -> Result<Option<usize>, TaskError> {
    let content = match &task.target {
        TaskTarget::Spec { kind, name } => fetcher.fetch_spec(*kind, name).await?.into_bytes(),
        TaskTarget::Description { kind, name } => {
            fetcher.fetch_description(*kind, name).await?.into_bytes()
        }
        TaskTarget::Log {
            container,
            previous,
        } => match fetcher.fetch_logs(container, tail_lines, *previous).await? {
            LogFetch::Log(bytes) if *previous && bytes.is_empty() => return Ok(None),
            LogFetch::Log(bytes) => bytes,
            LogFetch::NoPreviousContainer => return Ok(None),
        },
        TaskTarget::Inventory(kind) => fetcher.fetch_inventory(*kind).await?.into_bytes(),
    };

    let bytes = write_artifact(&task.path, &content).await?;
    Ok(Some(bytes))
}

async fn run_task(fetcher: &ArtifactFetcher, task: &CollectionTask, tail_lines: i64) -> TaskStatus {
    match collect_one(fetcher, task, tail_lines).await {
        Ok(Some(bytes)) => {
            info!("Wrote {} to {}", task.target, task.path.display());
            TaskStatus::Written { bytes }
        }
        Ok(None) => {
            debug!("Nothing to collect for {}", task.target);
            TaskStatus::Skipped
        }
        Err(err) => {
            error!("Error collecting {}: {}", task.target, err);
            TaskStatus::Failed(err)
        }
    }
}
