use std::ffi::OsString;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::collector::CollectorSettings;
use crate::error::CredentialsError;
use crate::layout::BundleLayout;

/// Everything a run needs, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub kubeconfig: PathBuf,
    pub namespace: Option<String>,
    pub layout: BundleLayout,
    pub settings: CollectorSettings,
}

impl CollectorConfig {
    /// `kubeconfig_env` is the value of `KUBECONFIG`, passed in so callers
    /// control the environment.
    pub fn from_cli(cli: &Cli, kubeconfig_env: Option<OsString>) -> Result<Self, CredentialsError> {
        let kubeconfig = resolve_kubeconfig(cli.kubeconfig.clone(), kubeconfig_env)?;
        Ok(Self {
            kubeconfig,
            namespace: cli.namespace.clone().filter(|ns| !ns.is_empty()),
            layout: BundleLayout::for_output_dir(cli.output_dir.as_deref()),
            settings: CollectorSettings {
                tail_lines: cli.tail_lines,
                max_concurrency: cli.max_concurrency,
            },
        })
    }
}

/// The `--kubeconfig` flag wins over a non-empty `KUBECONFIG`.
pub fn resolve_kubeconfig(
    flag: Option<PathBuf>,
    env: Option<OsString>,
) -> Result<PathBuf, CredentialsError> {
    flag.filter(|p| !p.as_os_str().is_empty())
        .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .ok_or(CredentialsError::Missing)
}
