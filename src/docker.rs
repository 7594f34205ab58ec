//! Docker implementation of the container runtime interface

use crate::error::{AttachError, RuntimeError};
use crate::runtime::{ContainerRuntime, ExecOutput};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::EndpointSettings;
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions, InspectNetworkOptions, ListNetworksOptions};
use bollard::Docker;
use futures::StreamExt;
use std::collections::BTreeSet;
use tracing::debug;

/// Container runtime backed by the Docker daemon
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect to the Docker daemon and verify it responds.
    ///
    /// Connection priority:
    /// 1. Explicit docker_host parameter
    /// 2. DOCKER_HOST environment variable
    /// 3. Common socket paths (platform-specific)
    pub async fn new(docker_host: Option<&str>) -> Result<Self, RuntimeError> {
        let client = if let Some(host) = docker_host {
            Self::connect_to_host(host)?
        } else if let Ok(host) = std::env::var("DOCKER_HOST") {
            Self::connect_to_host(&host)?
        } else {
            Self::connect_with_defaults().await?
        };

        client.ping().await.map_err(|e| {
            RuntimeError::Unavailable(format!(
                "Docker daemon is not responding: {}. \
                 Ensure Docker Desktop, Colima, or dockerd is running.",
                e
            ))
        })?;

        debug!("Connected to Docker daemon");
        Ok(Self { client })
    }

    fn connect_to_host(host: &str) -> Result<Docker, RuntimeError> {
        let result = if host.starts_with("unix://") {
            let socket_path = host.trim_start_matches("unix://");
            Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            Docker::connect_with_http(host, 120, bollard::API_DEFAULT_VERSION)
        } else {
            return Err(RuntimeError::Unavailable(format!(
                "Invalid docker_host format: '{}'. \
                 Expected 'unix:///path/to/socket' or 'tcp://host:port'",
                host
            )));
        };

        result.map_err(|e| {
            RuntimeError::Unavailable(format!("Cannot connect to Docker at '{}': {}", host, e))
        })
    }

    async fn connect_with_defaults() -> Result<Docker, RuntimeError> {
        let home = std::env::var("HOME").unwrap_or_default();
        let xdg_runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_default();

        let socket_paths: Vec<(&str, String)> = vec![
            ("Linux default", "/var/run/docker.sock".to_string()),
            ("Docker Desktop (macOS)", format!("{}/.docker/run/docker.sock", home)),
            ("Colima (macOS)", format!("{}/.colima/default/docker.sock", home)),
            ("Rancher Desktop", format!("{}/.rd/docker.sock", home)),
            ("Podman (Linux)", format!("{}/podman/podman.sock", xdg_runtime)),
        ];

        for (name, path) in &socket_paths {
            if path.is_empty() || path.contains("//") {
                continue; // Skip invalid paths from empty env vars
            }

            if std::path::Path::new(path).exists() {
                debug!(path, name, "Found Docker socket");
                if let Ok(client) =
                    Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION)
                {
                    if client.ping().await.is_ok() {
                        return Ok(client);
                    }
                }
            }
        }

        Docker::connect_with_socket_defaults().map_err(|e| {
            RuntimeError::Unavailable(format!(
                "Cannot connect to Docker daemon. \
                 Start Docker or set DOCKER_HOST. Underlying error: {}",
                e
            ))
        })
    }
}

fn is_not_found(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn api_error(operation: &'static str, err: DockerError) -> RuntimeError {
    RuntimeError::Api {
        operation,
        message: err.to_string(),
    }
}

impl ContainerRuntime for DockerRuntime {
    async fn endpoint_exists(&self, endpoint: &str) -> Result<bool, RuntimeError> {
        match self.client.inspect_container(endpoint, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(api_error("inspect container", e)),
        }
    }

    async fn endpoint_running(&self, endpoint: &str) -> Result<bool, RuntimeError> {
        match self.client.inspect_container(endpoint, None).await {
            Ok(info) => Ok(info.state.and_then(|s| s.running).unwrap_or(false)),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(api_error("inspect container", e)),
        }
    }

    async fn attached_networks(&self, endpoint: &str) -> Result<BTreeSet<String>, RuntimeError> {
        match self.client.inspect_container(endpoint, None).await {
            Ok(info) => Ok(info
                .network_settings
                .and_then(|s| s.networks)
                .map(|networks| networks.into_keys().collect())
                .unwrap_or_default()),
            Err(e) if is_not_found(&e) => Ok(BTreeSet::new()),
            Err(e) => Err(api_error("inspect container networks", e)),
        }
    }

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        match self
            .client
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(api_error("inspect network", e)),
        }
    }

    async fn networks_by_prefix(&self, prefix: &str) -> Result<BTreeSet<String>, RuntimeError> {
        let networks = self
            .client
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(|e| api_error("list networks", e))?;

        Ok(networks
            .into_iter()
            .filter_map(|n| n.name)
            .filter(|name| name.starts_with(prefix))
            .collect())
    }

    async fn attach(&self, endpoint: &str, network: &str) -> Result<(), AttachError> {
        let options = ConnectNetworkOptions {
            container: endpoint,
            endpoint_config: EndpointSettings::default(),
        };

        self.client
            .connect_network(network, options)
            .await
            .map_err(|e| AttachError {
                network: network.to_string(),
                message: e.to_string(),
            })
    }

    async fn create_network(&self, name: &str) -> Result<(), RuntimeError> {
        let options = CreateNetworkOptions {
            name,
            check_duplicate: true,
            ..Default::default()
        };

        self.client
            .create_network(options)
            .await
            .map(|_| ())
            .map_err(|e| api_error("create network", e))
    }

    async fn exec(&self, endpoint: &str, cmd: &[String]) -> Result<ExecOutput, RuntimeError> {
        let options = CreateExecOptions {
            cmd: Some(cmd.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .client
            .create_exec(endpoint, options)
            .await
            .map_err(|e| api_error("create exec", e))?;

        let mut output = String::new();
        match self
            .client
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| api_error("start exec", e))?
        {
            StartExecResults::Attached {
                output: mut stream, ..
            } => {
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(log) => output.push_str(&log.to_string()),
                        Err(e) => return Err(api_error("read exec output", e)),
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self
            .client
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| api_error("inspect exec", e))?;

        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(-1),
            output,
        })
    }
}
