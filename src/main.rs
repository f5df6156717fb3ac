mod cli;
mod collector;
mod config;
mod error;
mod fetcher;
mod kubernetes;
mod layout;
mod namespace;
mod types;
mod writer;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use kube::Client;
use kube::config::{Config as KubeConfig, KubeConfigOptions, Kubeconfig};
use tracing::{error, info};

use cli::Cli;
use collector::Collector;
use config::CollectorConfig;
use kubernetes::KubeClusterReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match CollectorConfig::from_cli(&cli, std::env::var_os("KUBECONFIG")) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let client = initialize_client(&config.kubeconfig).await?;
    let reader = Arc::new(KubeClusterReader::new(
        client,
        Some(config.kubeconfig.clone()),
    ));

    let collector = Collector::new(reader, config.layout, config.settings);
    let report = match collector.run(config.namespace.as_deref()).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Resource gathering completed successfully and have been stored in {}",
        report.bundle_root.display()
    );
    Ok(())
}

async fn initialize_client(kubeconfig_path: &Path) -> anyhow::Result<Client> {
    let kubeconfig = Kubeconfig::read_from(kubeconfig_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read kubeconfig '{}': {}",
            kubeconfig_path.display(),
            e
        )
    })?;
    let current_context = kubeconfig
        .current_context
        .clone()
        .unwrap_or_else(|| "default".to_string());

    let config =
        KubeConfig::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    let client = Client::try_from(config)?;
    info!("Using context: {}", current_context);
    Ok(client)
}
