//! Network reconciliation: compare declared vs. actual attachments
//!
//! Given a declared set of target networks and the managed proxy container,
//! computes and applies the minimal set of attach operations. The runtime's
//! network graph is externally mutable (operators, other tooling, network
//! deletion), so nothing is cached: every decision is check-before-act
//! against a fresh query, and a failed attach is recorded and skipped
//! rather than aborting the remaining targets.

use crate::error::RuntimeError;
use crate::runtime::ContainerRuntime;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

/// One operator-declared resolution rule for target networks
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    /// A literal network name; resolution is an existence check
    Exact(String),
    /// A project identifier; resolves to every network named `<id>-*`
    Prefix(String),
}

/// The declared desired state: an ordered list of target rules.
///
/// The shared network is always the first entry, ahead of whatever the
/// operator declared, so the stack's own plumbing is wired before any
/// per-project networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    rules: Vec<TargetRule>,
}

impl TargetSet {
    /// Build a target set with the implicit shared-network entry first
    pub fn with_shared(shared: &str, declared: Vec<TargetRule>) -> Self {
        let mut rules = Vec::with_capacity(declared.len() + 1);
        rules.push(TargetRule::Exact(shared.to_string()));
        rules.extend(declared);
        Self { rules }
    }

    /// Build a target set from rules alone, with no implicit entry
    pub fn from_rules(rules: Vec<TargetRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TargetRule] {
        &self.rules
    }
}

/// Outcome for one resolved target (or for the whole run, for the two
/// endpoint short-circuits)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The managed container does not exist; nothing was attempted
    EndpointNotFound { endpoint: String },
    /// The managed container exists but is not running; nothing was attempted
    EndpointNotRunning { endpoint: String },
    /// Already attached; no action taken
    AlreadyConnected { network: String },
    /// Attach succeeded
    Connected { network: String },
    /// An exact-name target does not exist in the runtime; no attach attempted
    TargetMissing { network: String },
    /// A prefix rule matched no networks; informational, not an error
    EmptyPrefixMatch { prefix: String },
    /// Attach was attempted and failed (usually a race with external mutation)
    AttachFailed { network: String, cause: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::EndpointNotFound { endpoint } => {
                write!(f, "endpoint '{}' not found", endpoint)
            }
            Outcome::EndpointNotRunning { endpoint } => {
                write!(f, "endpoint '{}' not running", endpoint)
            }
            Outcome::AlreadyConnected { network } => {
                write!(f, "already connected to '{}'", network)
            }
            Outcome::Connected { network } => write!(f, "connected to '{}'", network),
            Outcome::TargetMissing { network } => {
                write!(f, "target network '{}' does not exist", network)
            }
            Outcome::EmptyPrefixMatch { prefix } => {
                write!(f, "no networks found for prefix '{}'", prefix)
            }
            Outcome::AttachFailed { network, cause } => {
                write!(f, "failed to attach to '{}': {}", network, cause)
            }
        }
    }
}

/// Ordered record of what reconciliation did, one entry per resolved target.
///
/// A pure data value: the caller decides what counts as overall success.
/// This tool treats attach failures and missing targets as warnings, and
/// only runtime-level errors as fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub entries: Vec<Outcome>,
}

impl ReconciliationReport {
    /// Whether the run short-circuited because the endpoint was absent or stopped
    pub fn endpoint_skipped(&self) -> bool {
        matches!(
            self.entries.first(),
            Some(Outcome::EndpointNotFound { .. }) | Some(Outcome::EndpointNotRunning { .. })
        )
    }

    /// Number of attachments actually performed this run
    pub fn connected(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Outcome::Connected { .. }))
            .count()
    }

    /// Number of targets that were already attached
    pub fn already_connected(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Outcome::AlreadyConnected { .. }))
            .count()
    }

    /// Number of per-target warnings (missing targets and failed attaches)
    pub fn warnings(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Outcome::TargetMissing { .. } | Outcome::AttachFailed { .. }
                )
            })
            .count()
    }
}

/// Reconcile the endpoint's network attachments against the target set.
///
/// Idempotent: re-running with no external mutation yields a report of
/// nothing but `AlreadyConnected` entries. Only a `RuntimeError` (the
/// runtime itself is unreachable) aborts; every per-target problem is
/// recorded in the report and the remaining targets are still attempted.
pub async fn reconcile<R: ContainerRuntime>(
    runtime: &R,
    endpoint: &str,
    targets: &TargetSet,
) -> Result<ReconciliationReport, RuntimeError> {
    let mut report = ReconciliationReport::default();

    // Endpoint guards. Absence is an expected transient state during a
    // staged rollout, so these short-circuit with a warning outcome
    // instead of an error.
    if !runtime.endpoint_exists(endpoint).await? {
        warn!(endpoint, "Endpoint not found, skipping network reconciliation");
        report.entries.push(Outcome::EndpointNotFound {
            endpoint: endpoint.to_string(),
        });
        return Ok(report);
    }
    if !runtime.endpoint_running(endpoint).await? {
        warn!(endpoint, "Endpoint not running, skipping network reconciliation");
        report.entries.push(Outcome::EndpointNotRunning {
            endpoint: endpoint.to_string(),
        });
        return Ok(report);
    }

    for rule in targets.rules() {
        match rule {
            TargetRule::Exact(name) => {
                if !runtime.network_exists(name).await? {
                    warn!(network = %name, "Declared network does not exist, skipping");
                    report.entries.push(Outcome::TargetMissing {
                        network: name.clone(),
                    });
                    continue;
                }
                let outcome = connect_one(runtime, endpoint, name).await?;
                report.entries.push(outcome);
            }
            TargetRule::Prefix(project) => {
                // Anchored at the start and hyphen-delimited: "acme" must
                // match "acme-web" but never "acmeother-x".
                let prefix = format!("{}-", project);
                let matches = runtime.networks_by_prefix(&prefix).await?;
                if matches.is_empty() {
                    info!(prefix = %project, "No networks found for declared prefix");
                    report.entries.push(Outcome::EmptyPrefixMatch {
                        prefix: project.clone(),
                    });
                    continue;
                }
                debug!(prefix = %project, count = matches.len(), "Resolved prefix rule");
                for name in &matches {
                    let outcome = connect_one(runtime, endpoint, name).await?;
                    report.entries.push(outcome);
                }
            }
        }
    }

    Ok(report)
}

/// Attach the endpoint to one resolved network, check-before-act.
///
/// Membership is re-queried for every target rather than fetched once up
/// front: the graph is mutated by entities outside this process, so prior
/// knowledge within the same run is already suspect.
async fn connect_one<R: ContainerRuntime>(
    runtime: &R,
    endpoint: &str,
    network: &str,
) -> Result<Outcome, RuntimeError> {
    let attached = runtime.attached_networks(endpoint).await?;
    if attached.contains(network) {
        debug!(endpoint, network, "Already connected");
        return Ok(Outcome::AlreadyConnected {
            network: network.to_string(),
        });
    }

    match runtime.attach(endpoint, network).await {
        Ok(()) => {
            info!(endpoint, network, "Connected endpoint to network");
            Ok(Outcome::Connected {
                network: network.to_string(),
            })
        }
        Err(e) => {
            // Expected race: the network can disappear between the
            // membership query and the attach call. Warn and move on.
            warn!(endpoint, network, error = %e.message, "Attach failed, continuing");
            Ok(Outcome::AttachFailed {
                network: network.to_string(),
                cause: e.message,
            })
        }
    }
}

/// Ensure a network exists, creating it if missing. Returns true if created.
///
/// Same check-before-act pattern as attachment: if the create call loses a
/// race with concurrent creation, a re-check treats the network as present.
pub async fn ensure_network<R: ContainerRuntime>(
    runtime: &R,
    name: &str,
) -> Result<bool, RuntimeError> {
    if runtime.network_exists(name).await? {
        debug!(network = %name, "Shared network already exists");
        return Ok(false);
    }

    match runtime.create_network(name).await {
        Ok(()) => {
            info!(network = %name, "Created shared network");
            Ok(true)
        }
        Err(e) => {
            if runtime.network_exists(name).await? {
                debug!(network = %name, "Shared network created concurrently");
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}
