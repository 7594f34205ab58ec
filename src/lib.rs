//! Proxylink - bootstrap tooling for a shared reverse-proxy stack
//!
//! This library provides the pieces needed to bring a multi-tenant
//! reverse-proxy/logging stack online and keep it wired up:
//! - Reconciles the proxy container's Docker network attachments against
//!   a declared set of target networks (exact names or project prefixes)
//! - Ensures the shared logging network exists before anything joins it
//! - Provisions secrets and data directories for first boot
//! - Validates and reloads the proxy configuration inside the running container
//!
//! Reconciliation is idempotent: every run re-reads the runtime's actual
//! state, so repeated runs converge without tracking prior invocations.

pub mod config;
pub mod docker;
pub mod error;
pub mod provision;
pub mod reconciler;
pub mod reload;
pub mod runtime;
