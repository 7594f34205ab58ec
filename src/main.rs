use proxylink::config::Config;
use proxylink::docker::DockerRuntime;
use proxylink::provision;
use proxylink::reconciler::{self, Outcome, ReconciliationReport, TargetSet};
use proxylink::reload;
use std::path::PathBuf;
use tracing::{error, info, warn};

const USAGE: &str = "Usage: proxylink <command> [config.toml]

Commands:
  init      Provision secrets/directories and create the shared network
  connect   Reconcile the proxy's network attachments and reload its config
  up        init followed by connect";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("proxylink=debug".parse().expect("valid log directive")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(cmd) => cmd,
        None => {
            eprintln!("{}", USAGE);
            anyhow::bail!("missing command");
        }
    };

    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("proxylink.toml"));

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path.display(), error = %e, "Failed to load configuration");
        e
    })?;
    info!(path = %config_path.display(), "Configuration loaded");

    match command.as_str() {
        "init" => init(&config).await,
        "connect" => connect(&config).await,
        "up" => {
            init(&config).await?;
            connect(&config).await
        }
        other => {
            eprintln!("{}", USAGE);
            anyhow::bail!("unknown command '{}'", other);
        }
    }
}

/// Provision secrets and directories, then make sure the shared network exists
async fn init(config: &Config) -> anyhow::Result<()> {
    if let Some(provision_config) = &config.provision {
        let report = provision::provision(provision_config)?;
        info!(
            created_dirs = report.created_dirs.len(),
            env_file_written = report.env_file_written,
            "Provisioning complete"
        );
    } else {
        info!("No provisioning configured, skipping");
    }

    let runtime = DockerRuntime::new(config.endpoint.docker_host.as_deref()).await?;
    let created = reconciler::ensure_network(&runtime, &config.networks.shared).await?;
    if created {
        info!(network = %config.networks.shared, "Shared network created");
    } else {
        info!(network = %config.networks.shared, "Shared network already present");
    }

    Ok(())
}

/// Reconcile network attachments, then reload the proxy configuration.
///
/// Per-target problems (missing networks, failed attaches) and an absent or
/// stopped endpoint are warnings: the run still exits zero. Only an
/// unreachable runtime or a failed reload produce a failing status.
async fn connect(config: &Config) -> anyhow::Result<()> {
    let runtime = DockerRuntime::new(config.endpoint.docker_host.as_deref()).await?;
    let endpoint = &config.endpoint.container;

    reconciler::ensure_network(&runtime, &config.networks.shared).await?;

    let targets = TargetSet::with_shared(
        &config.networks.shared,
        config.networks.targets.clone(),
    );

    let report = reconciler::reconcile(&runtime, endpoint, &targets).await?;
    log_report(&report);

    if report.endpoint_skipped() {
        warn!(endpoint, "Endpoint unavailable, skipping configuration reload");
        return Ok(());
    }

    if let Some(reload_config) = &config.reload {
        reload::reload(&runtime, endpoint, reload_config)
            .await
            .map_err(|e| {
                error!(endpoint, error = %e, "Configuration reload failed");
                anyhow::anyhow!(e)
            })?;
    }

    Ok(())
}

/// Log every reconciliation outcome individually, then a one-line summary
fn log_report(report: &ReconciliationReport) {
    for entry in &report.entries {
        match entry {
            Outcome::Connected { .. } | Outcome::AlreadyConnected { .. } => {
                info!("{}", entry)
            }
            Outcome::EmptyPrefixMatch { .. } => info!("{}", entry),
            _ => warn!("{}", entry),
        }
    }

    info!(
        connected = report.connected(),
        already_connected = report.already_connected(),
        warnings = report.warnings(),
        "Network reconciliation complete"
    );
}
