//! Reload trigger: validate and apply proxy configuration in-place
//!
//! Runs the configured commands inside the running endpoint. Validation
//! gates the reload, but a reload failure never rolls back network
//! attachments made earlier in the run; attachments and reload are not
//! transactional.

use crate::config::ReloadConfig;
use crate::error::{ReloadError, RuntimeError};
use crate::runtime::ContainerRuntime;
use tracing::{debug, info};

fn split_command(cmd: &str) -> Result<Vec<String>, ReloadError> {
    shell_words::split(cmd).map_err(|e| ReloadError::Exec(format!("cannot parse '{}': {}", cmd, e)))
}

/// Validate (if configured) and reload the proxy configuration.
///
/// A nonzero exit from the validation command aborts before the reload is
/// attempted, so a broken config is never made live. Runtime-level failures
/// while trying to exec are mapped to `ReloadError::Exec`.
pub async fn reload<R: ContainerRuntime>(
    runtime: &R,
    endpoint: &str,
    config: &ReloadConfig,
) -> Result<(), ReloadError> {
    let run = |cmd: Vec<String>| async move {
        runtime
            .exec(endpoint, &cmd)
            .await
            .map_err(|e: RuntimeError| ReloadError::Exec(e.to_string()))
    };

    if let Some(validate_cmd) = &config.validate_cmd {
        let cmd = split_command(validate_cmd)?;
        debug!(endpoint, command = %validate_cmd, "Validating proxy configuration");
        let result = run(cmd).await?;
        if !result.success() {
            return Err(ReloadError::ValidationFailed {
                status: result.exit_code,
                output: result.output,
            });
        }
        debug!(endpoint, "Configuration validated");
    }

    let cmd = split_command(&config.reload_cmd)?;
    let result = run(cmd).await?;
    if !result.success() {
        return Err(ReloadError::ReloadFailed {
            status: result.exit_code,
            output: result.output,
        });
    }

    info!(endpoint, "Proxy configuration reloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttachError;
    use crate::runtime::ExecOutput;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Runtime whose exec returns scripted results, in order
    struct ScriptedExec {
        results: Mutex<Vec<ExecOutput>>,
        commands: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedExec {
        fn new(results: Vec<ExecOutput>) -> Self {
            Self {
                results: Mutex::new(results),
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    impl ContainerRuntime for ScriptedExec {
        async fn endpoint_exists(&self, _: &str) -> Result<bool, RuntimeError> {
            Ok(true)
        }
        async fn endpoint_running(&self, _: &str) -> Result<bool, RuntimeError> {
            Ok(true)
        }
        async fn attached_networks(&self, _: &str) -> Result<BTreeSet<String>, RuntimeError> {
            Ok(BTreeSet::new())
        }
        async fn network_exists(&self, _: &str) -> Result<bool, RuntimeError> {
            Ok(false)
        }
        async fn networks_by_prefix(&self, _: &str) -> Result<BTreeSet<String>, RuntimeError> {
            Ok(BTreeSet::new())
        }
        async fn attach(&self, _: &str, _: &str) -> Result<(), AttachError> {
            Ok(())
        }
        async fn create_network(&self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn exec(&self, _: &str, cmd: &[String]) -> Result<ExecOutput, RuntimeError> {
            self.commands.lock().unwrap().push(cmd.to_vec());
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                return Err(RuntimeError::Api {
                    operation: "exec",
                    message: "no scripted result".to_string(),
                });
            }
            Ok(results.remove(0))
        }
    }

    fn ok_exec() -> ExecOutput {
        ExecOutput {
            exit_code: 0,
            output: String::new(),
        }
    }

    fn failed_exec(code: i64, output: &str) -> ExecOutput {
        ExecOutput {
            exit_code: code,
            output: output.to_string(),
        }
    }

    #[tokio::test]
    async fn validate_then_reload() {
        let runtime = ScriptedExec::new(vec![ok_exec(), ok_exec()]);
        let config = ReloadConfig {
            validate_cmd: Some("nginx -t".to_string()),
            reload_cmd: "nginx -s reload".to_string(),
        };

        reload(&runtime, "proxy", &config).await.unwrap();

        let commands = runtime.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], vec!["nginx", "-t"]);
        assert_eq!(commands[1], vec!["nginx", "-s", "reload"]);
    }

    #[tokio::test]
    async fn validation_failure_blocks_reload() {
        let runtime = ScriptedExec::new(vec![failed_exec(1, "unexpected directive")]);
        let config = ReloadConfig {
            validate_cmd: Some("nginx -t".to_string()),
            reload_cmd: "nginx -s reload".to_string(),
        };

        let err = reload(&runtime, "proxy", &config).await.unwrap_err();
        assert!(matches!(
            err,
            ReloadError::ValidationFailed { status: 1, ref output } if output.contains("unexpected directive")
        ));
        // Only the validation command ran
        assert_eq!(runtime.commands.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reload_failure_is_reported_with_output() {
        let runtime = ScriptedExec::new(vec![failed_exec(2, "signal process failed")]);
        let config = ReloadConfig {
            validate_cmd: None,
            reload_cmd: "nginx -s reload".to_string(),
        };

        let err = reload(&runtime, "proxy", &config).await.unwrap_err();
        assert!(matches!(err, ReloadError::ReloadFailed { status: 2, .. }));
    }
}
