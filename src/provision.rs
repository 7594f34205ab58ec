//! First-boot provisioning: data directories and generated secrets
//!
//! Everything here is idempotent. Directories are created if missing and
//! an existing env file is never rewritten, so re-running bootstrap never
//! rotates credentials that services already hold.

use crate::config::ProvisionConfig;
use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;
use tracing::{debug, info};

/// Generate a random alphanumeric secret
pub fn generate_secret(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// What provisioning actually did, for operator-facing logging
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Directories created this run (existing ones are not listed)
    pub created_dirs: Vec<String>,
    /// Whether the env file was written (false = already existed)
    pub env_file_written: bool,
}

/// Create declared directories and write the secrets env file.
pub fn provision(config: &ProvisionConfig) -> anyhow::Result<ProvisionReport> {
    let mut report = ProvisionReport::default();

    for dir in &config.directories {
        if dir.exists() {
            debug!(path = %dir.display(), "Directory already exists");
            continue;
        }
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
        info!(path = %dir.display(), "Created directory");
        report.created_dirs.push(dir.display().to_string());
    }

    if config.env_file.exists() {
        info!(
            path = %config.env_file.display(),
            "Env file already exists, keeping existing secrets"
        );
        return Ok(report);
    }

    write_env_file(&config.env_file, &config.secrets, config.secret_length)?;
    info!(
        path = %config.env_file.display(),
        secrets = config.secrets.len(),
        "Generated secrets env file"
    );
    report.env_file_written = true;

    Ok(report)
}

fn write_env_file(path: &Path, secrets: &[String], length: usize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create env file directory '{}'", parent.display())
            })?;
        }
    }

    let mut content = String::new();
    for name in secrets {
        content.push_str(name);
        content.push('=');
        content.push_str(&generate_secret(length));
        content.push('\n');
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write env file '{}'", path.display()))?;

    // Secrets are owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions on '{}'", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvisionConfig;

    fn test_config(dir: &Path) -> ProvisionConfig {
        ProvisionConfig {
            env_file: dir.join("secrets/.env"),
            secrets: vec!["LOKI_PASSWORD".to_string(), "AUTH_SECRET".to_string()],
            secret_length: 24,
            directories: vec![dir.join("certs"), dir.join("logs")],
        }
    }

    #[test]
    fn test_generate_secret_charset_and_length() {
        let secret = generate_secret(32);
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));

        // Two generations should practically never collide
        assert_ne!(generate_secret(32), generate_secret(32));
    }

    #[test]
    fn test_provision_creates_dirs_and_env_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());

        let report = provision(&config).unwrap();
        assert_eq!(report.created_dirs.len(), 2);
        assert!(report.env_file_written);
        assert!(tmp.path().join("certs").is_dir());
        assert!(tmp.path().join("logs").is_dir());

        let content = std::fs::read_to_string(&config.env_file).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("LOKI_PASSWORD="));
        assert!(lines[1].starts_with("AUTH_SECRET="));
        assert_eq!(lines[0].len(), "LOKI_PASSWORD=".len() + 24);
    }

    #[test]
    fn test_rerun_keeps_existing_env_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());

        provision(&config).unwrap();
        let first = std::fs::read_to_string(&config.env_file).unwrap();

        let report = provision(&config).unwrap();
        assert!(!report.env_file_written);
        assert!(report.created_dirs.is_empty());

        let second = std::fs::read_to_string(&config.env_file).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        provision(&config).unwrap();

        let mode = std::fs::metadata(&config.env_file)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
