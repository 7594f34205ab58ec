//! TOML configuration for the bootstrap tool

use crate::reconciler::TargetRule;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The managed proxy container
    pub endpoint: EndpointConfig,

    /// Declared network targets
    #[serde(default)]
    pub networks: NetworksConfig,

    /// Commands to validate and reload the proxy configuration
    #[serde(default)]
    pub reload: Option<ReloadConfig>,

    /// First-boot provisioning of secrets and directories
    #[serde(default)]
    pub provision: Option<ProvisionConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    /// Name (or id) of the proxy container whose networks are reconciled
    pub container: String,

    /// Docker daemon address ("unix:///..." or "tcp://...").
    /// Falls back to DOCKER_HOST and then common socket paths.
    pub docker_host: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworksConfig {
    /// The shared network every stack member joins (default: "logging").
    /// Created on `init` if missing, and always the first reconciliation target.
    #[serde(default = "default_shared_network")]
    pub shared: String,

    /// Operator-declared targets, in the order they should be reconciled
    #[serde(default)]
    pub targets: Vec<TargetRule>,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            shared: default_shared_network(),
            targets: Vec::new(),
        }
    }
}

fn default_shared_network() -> String {
    "logging".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReloadConfig {
    /// Command run inside the container to validate the config before reload
    /// (e.g. "nginx -t"). If it exits nonzero, the reload is not attempted.
    pub validate_cmd: Option<String>,

    /// Command run inside the container to apply the config (e.g. "nginx -s reload")
    pub reload_cmd: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvisionConfig {
    /// Env file to write generated secrets into (KEY=value lines).
    /// Left untouched if it already exists.
    pub env_file: PathBuf,

    /// Names of secrets to generate (become the env file keys)
    #[serde(default)]
    pub secrets: Vec<String>,

    /// Generated secret length in characters
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,

    /// Data directories to create if missing
    #[serde(default)]
    pub directories: Vec<PathBuf>,
}

fn default_secret_length() -> usize {
    32 // enough entropy for service-to-service credentials
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration, collecting every problem before failing
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        if self.endpoint.container.trim().is_empty() {
            errors.push("endpoint.container must not be empty".to_string());
        }

        if self.networks.shared.trim().is_empty() {
            errors.push("networks.shared must not be empty".to_string());
        }

        for rule in &self.networks.targets {
            match rule {
                TargetRule::Exact(name) if name.trim().is_empty() => {
                    errors.push("networks.targets: exact rule with empty name".to_string());
                }
                TargetRule::Prefix(id) if id.trim().is_empty() => {
                    errors.push("networks.targets: prefix rule with empty identifier".to_string());
                }
                _ => {}
            }
        }

        if let Some(reload) = &self.reload {
            if let Err(e) = shell_words::split(&reload.reload_cmd) {
                errors.push(format!("reload.reload_cmd is not parseable: {}", e));
            } else if reload.reload_cmd.trim().is_empty() {
                errors.push("reload.reload_cmd must not be empty".to_string());
            }
            if let Some(validate) = &reload.validate_cmd {
                if let Err(e) = shell_words::split(validate) {
                    errors.push(format!("reload.validate_cmd is not parseable: {}", e));
                }
            }
        }

        if let Some(provision) = &self.provision {
            if provision.secret_length == 0 {
                errors.push("provision.secret_length must be at least 1".to_string());
            }
            for name in &provision.secrets {
                if name.trim().is_empty() || name.contains(['=', '\n']) {
                    errors.push(format!("provision.secrets: invalid secret name '{}'", name));
                }
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration errors:\n  - {}", errors.join("\n  - "));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[endpoint]
container = "proxy"

[networks]
shared = "logging"
targets = [
    { exact = "frontend" },
    { prefix = "acme" },
]

[reload]
validate_cmd = "nginx -t"
reload_cmd = "nginx -s reload"

[provision]
env_file = "/srv/proxy/.env"
secrets = ["LOKI_PASSWORD", "BASIC_AUTH_SECRET"]
directories = ["/srv/proxy/certs", "/srv/proxy/logs"]
"#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.endpoint.container, "proxy");
        assert_eq!(config.networks.shared, "logging");
        assert_eq!(
            config.networks.targets,
            vec![
                TargetRule::Exact("frontend".to_string()),
                TargetRule::Prefix("acme".to_string()),
            ]
        );
        let reload = config.reload.unwrap();
        assert_eq!(reload.validate_cmd.as_deref(), Some("nginx -t"));
        let provision = config.provision.unwrap();
        assert_eq!(provision.secrets.len(), 2);
        assert_eq!(provision.secret_length, 32);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let toml = r#"
[endpoint]
container = "proxy"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.networks.shared, "logging");
        assert!(config.networks.targets.is_empty());
        assert!(config.reload.is_none());
        assert!(config.provision.is_none());
    }

    #[test]
    fn test_empty_container_rejected() {
        let toml = r#"
[endpoint]
container = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("endpoint.container"));
    }

    #[test]
    fn test_invalid_rules_collected() {
        let toml = r#"
[endpoint]
container = "proxy"

[networks]
targets = [
    { exact = "" },
    { prefix = "" },
]

[reload]
reload_cmd = "nginx -s 'reload"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("exact rule with empty name"));
        assert!(err.contains("prefix rule with empty identifier"));
        assert!(err.contains("reload.reload_cmd is not parseable"));
    }

    #[test]
    fn test_secret_name_validation() {
        let toml = r#"
[endpoint]
container = "proxy"

[provision]
env_file = "/tmp/.env"
secrets = ["GOOD", "BAD=NAME"]
secret_length = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("secret_length"));
        assert!(err.contains("BAD=NAME"));
    }
}
