// Docker CLI plumbing for chain containers
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::context::CancelSignal;
use crate::error::{HarnessError, Result};

/// Label attached to every container and network the harness creates
pub const HARNESS_LABEL: &str = "sdjwt-interchaintest";

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external programs; swapped for a recording runner in tests
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], stdin: Option<&[u8]>)
        -> Result<CommandOutput>;
}

/// Runs programs as child processes, killed when the context is cancelled
pub struct ProcessRunner {
    cancel: Option<CancelSignal>,
}

impl ProcessRunner {
    pub fn new(cancel: CancelSignal) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    /// Runner that ignores cancellation, used for teardown
    pub fn detached() -> Self {
        Self { cancel: None }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        let describe = || format!("{} {}", program, args.join(" "));

        if self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled) {
            return Err(HarnessError::Cancelled(describe()));
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        if let Some(input) = stdin {
            let mut pipe = child
                .stdin
                .take()
                .ok_or_else(|| HarnessError::UnexpectedOutput("child stdin unavailable".to_string()))?;
            pipe.write_all(input).await?;
            drop(pipe);
        }

        let output = match self.cancel.clone() {
            Some(mut cancel) => {
                tokio::select! {
                    output = child.wait_with_output() => output?,
                    _ = cancel.cancelled() => return Err(HarnessError::Cancelled(describe())),
                }
            }
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Options for a long-running node container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub network: String,
    /// Container ports published on an ephemeral loopback port
    pub published_ports: Vec<u16>,
    /// Value of the harness label, groups resources of one test
    pub owner: String,
}

/// Typed wrapper over the `docker` CLI
#[derive(Clone)]
pub struct DockerCli {
    runner: Arc<dyn CommandRunner>,
}

impl DockerCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn docker(&self, args: Vec<String>, stdin: Option<&[u8]>) -> Result<CommandOutput> {
        debug!("docker {}", args.join(" "));
        let output = self.runner.run("docker", &args, stdin).await?;
        if !output.success() {
            return Err(HarnessError::Command {
                program: "docker".to_string(),
                args: args.join(" "),
                status: output
                    .status
                    .map(|code| format!("exit code {}", code))
                    .unwrap_or_else(|| "terminated by signal".to_string()),
                stderr: output.stderr_str().trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Fail early when the docker daemon cannot be reached
    pub async fn check_available(&self) -> Result<()> {
        match self.docker(strings(&["version", "--format", "{{.Server.Version}}"]), None).await {
            Ok(output) => {
                debug!("Docker server version {}", output.stdout_str().trim());
                Ok(())
            }
            Err(e) => Err(HarnessError::DockerUnavailable(e.to_string())),
        }
    }

    pub async fn create_network(&self, name: &str, owner: &str) -> Result<()> {
        self.docker(
            strings(&["network", "create", "--label", &label(owner), name]),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn remove_network(&self, name: &str) -> Result<()> {
        self.docker(strings(&["network", "rm", name]), None).await?;
        Ok(())
    }

    /// Start a container that idles until commands are exec'd into it
    pub async fn run_idle(&self, spec: &ContainerSpec) -> Result<()> {
        let mut args = strings(&[
            "run",
            "-d",
            "--name",
            &spec.name,
            "--network",
            &spec.network,
            "--network-alias",
            &spec.name,
            "--label",
            &label(&spec.owner),
            "--user",
            "0:0",
        ]);
        for port in &spec.published_ports {
            args.push("-p".to_string());
            args.push(format!("127.0.0.1::{}", port));
        }
        args.extend(strings(&["--entrypoint", "sleep", &spec.image, "infinity"]));

        self.docker(args, None).await?;
        Ok(())
    }

    /// Run a command in a container and return its output, failing on non-zero exit
    pub async fn exec(&self, container: &str, cmd: &[String]) -> Result<CommandOutput> {
        let mut args = strings(&["exec", container]);
        args.extend_from_slice(cmd);
        self.docker(args, None).await
    }

    /// Like [`DockerCli::exec`] with `input` on the command's stdin
    pub async fn exec_with_stdin(
        &self,
        container: &str,
        cmd: &[String],
        input: &[u8],
    ) -> Result<CommandOutput> {
        let mut args = strings(&["exec", "-i", container]);
        args.extend_from_slice(cmd);
        self.docker(args, Some(input)).await
    }

    /// Start a command in the background inside a container
    pub async fn exec_detached(&self, container: &str, cmd: &[String]) -> Result<()> {
        let mut args = strings(&["exec", "-d", container]);
        args.extend_from_slice(cmd);
        self.docker(args, None).await?;
        Ok(())
    }

    pub async fn read_file(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        Ok(self.exec(container, &strings(&["cat", path])).await?.stdout)
    }

    pub async fn write_file(&self, container: &str, path: &str, content: &[u8]) -> Result<()> {
        let script = format!("cat > '{}'", path);
        self.exec_with_stdin(container, &strings(&["sh", "-c", &script]), content)
            .await?;
        Ok(())
    }

    pub async fn copy_into(&self, local: &Path, container: &str, dest: &str) -> Result<()> {
        self.docker(
            vec![
                "cp".to_string(),
                local.to_string_lossy().into_owned(),
                format!("{}:{}", container, dest),
            ],
            None,
        )
        .await?;
        Ok(())
    }

    /// Loopback port docker mapped to a container port
    pub async fn host_port(&self, container: &str, port: u16) -> Result<u16> {
        let output = self
            .docker(strings(&["port", container, &format!("{}/tcp", port)]), None)
            .await?;
        parse_host_port(&output.stdout_str())
    }

    pub async fn remove_container(&self, name: &str) -> Result<()> {
        self.docker(strings(&["rm", "-f", "-v", name]), None).await?;
        Ok(())
    }
}

/// Blocking best-effort removal, used where no runtime is available (Drop)
pub fn force_remove_blocking(containers: &[String], network: &str) {
    for container in containers {
        let result = std::process::Command::new("docker")
            .args(["rm", "-f", "-v", container])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = result {
            warn!("Failed to remove container {}: {}", container, e);
        }
    }
    let result = std::process::Command::new("docker")
        .args(["network", "rm", network])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        warn!("Failed to remove network {}: {}", network, e);
    }
}

fn label(owner: &str) -> String {
    format!("{}={}", HARNESS_LABEL, owner)
}

pub(crate) fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Parse `docker port` output such as `127.0.0.1:49153`
fn parse_host_port(output: &str) -> Result<u16> {
    output
        .lines()
        .filter_map(|line| line.trim().rsplit(':').next())
        .find_map(|port| port.parse::<u16>().ok())
        .ok_or_else(|| HarnessError::UnexpectedOutput(format!("no host port in {:?}", output)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::test_utils::RecordingRunner;

    #[test]
    fn test_parse_host_port() {
        assert_eq!(parse_host_port("127.0.0.1:49153\n").unwrap(), 49153);
        assert_eq!(parse_host_port("0.0.0.0:32768\n[::]:32768\n").unwrap(), 32768);
        assert!(parse_host_port("").is_err());
    }

    #[tokio::test]
    async fn test_run_idle_arguments() {
        let runner = Arc::new(RecordingRunner::new());
        let docker = DockerCli::new(runner.clone());

        docker
            .run_idle(&ContainerSpec {
                name: "net-juno-val-0".to_string(),
                image: "ghcr.io/cosmoscontracts/juno:v17.0.0".to_string(),
                network: "net".to_string(),
                published_ports: vec![26657],
                owner: "juno-start".to_string(),
            })
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        let line = calls[0].command_line();
        assert!(line.starts_with("docker run -d --name net-juno-val-0 --network net"));
        assert!(line.contains("--label sdjwt-interchaintest=juno-start"));
        assert!(line.contains("-p 127.0.0.1::26657"));
        assert!(line.ends_with("--entrypoint sleep ghcr.io/cosmoscontracts/juno:v17.0.0 infinity"));
    }

    #[tokio::test]
    async fn test_failed_command_reports_stderr() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_failure("Error: No such container: ghost");
        let docker = DockerCli::new(runner.clone());

        let err = docker.exec("ghost", &strings(&["true"])).await.unwrap_err();
        match err {
            HarnessError::Command { stderr, args, .. } => {
                assert_eq!(stderr, "Error: No such container: ghost");
                assert_eq!(args, "exec ghost true");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_file_pipes_stdin() {
        let runner = Arc::new(RecordingRunner::new());
        let docker = DockerCli::new(runner.clone());

        docker
            .write_file("node", "/home/config/genesis.json", b"{}")
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0].command_line(),
            "docker exec -i node sh -c cat > '/home/config/genesis.json'"
        );
        assert_eq!(calls[0].stdin.as_deref(), Some(b"{}".as_slice()));
    }

    #[tokio::test]
    async fn test_check_available_maps_errors() {
        let runner = Arc::new(RecordingRunner::new());
        runner.push_failure("Cannot connect to the Docker daemon");
        let docker = DockerCli::new(runner);

        let err = docker.check_available().await.unwrap_err();
        assert!(matches!(err, HarnessError::DockerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_process_runner_refuses_after_cancel() {
        let context = crate::context::ChainContext::new();
        let runner = ProcessRunner::new(context.signal());
        context.cancel();

        let err = runner.run("true", &[], None).await.unwrap_err();
        assert!(matches!(err, HarnessError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let runner = ProcessRunner::detached();
        let output = runner
            .run("sh", &strings(&["-c", "read line; echo got:$line"]), Some(b"hello\n"))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_str().trim(), "got:hello");
    }
}
