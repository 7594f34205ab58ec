//! Container runtime abstraction consumed by the reconciler
//!
//! The reconciler never talks to a concrete runtime CLI or API directly;
//! it works against this trait so the decision logic can be tested with an
//! in-memory runtime and the Docker binding stays in one place.

use crate::error::{AttachError, RuntimeError};
use std::collections::BTreeSet;

/// Captured result of running a command inside the endpoint
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code (0 = success)
    pub exit_code: i64,
    /// Combined stdout/stderr, for operator-facing error messages
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Query and mutation interface over the container runtime.
///
/// Queries that fail because the object does not exist return `false` or an
/// empty set; a `RuntimeError` means the runtime itself could not be reached
/// and is fatal to the whole run. Attach failures are returned as values
/// because they are expected under concurrent external mutation.
pub trait ContainerRuntime {
    /// Whether a container with this id/name exists (in any state)
    fn endpoint_exists(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<bool, RuntimeError>> + Send;

    /// Whether the container exists and is currently running
    fn endpoint_running(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<bool, RuntimeError>> + Send;

    /// Names of the networks the container is currently attached to
    fn attached_networks(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<BTreeSet<String>, RuntimeError>> + Send;

    /// Whether a network with exactly this name exists
    fn network_exists(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<bool, RuntimeError>> + Send;

    /// All existing network names starting with `prefix`
    fn networks_by_prefix(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<BTreeSet<String>, RuntimeError>> + Send;

    /// Attach the container to a network
    fn attach(
        &self,
        endpoint: &str,
        network: &str,
    ) -> impl std::future::Future<Output = Result<(), AttachError>> + Send;

    /// Create a network; callers are expected to existence-check first
    fn create_network(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), RuntimeError>> + Send;

    /// Run a command inside the running container and capture its result
    fn exec(
        &self,
        endpoint: &str,
        cmd: &[String],
    ) -> impl std::future::Future<Output = Result<ExecOutput, RuntimeError>> + Send;
}
