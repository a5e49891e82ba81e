//! TR-012: Local execution handler.
//!
//! Runs exec command lines through `bash` on this machine, in the project
//! directory. Image builds and cluster manifests are not handled locally.

use super::Request;
use crate::core::error::HandlerError;
use crate::core::types::{Command, CommandKind, Component};
use crate::engine::Handler;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Placeholder devfiles use for the project source directory.
const PROJECT_SOURCE: &str = "${PROJECT_SOURCE}";

/// Output from running a command line.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocalError {
    #[error("failed to spawn bash: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("stdin write error: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("wait error: {0}")]
    Wait(#[source] std::io::Error),

    #[error("command '{id}' exited with code {exit_code}: {stderr}")]
    Failed {
        id: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("{request}: not supported by the local handler")]
    UnsupportedRequest { request: String },
}

/// Run `script` with `bash` in `dir` with extra environment variables.
/// Uses bash (not sh/dash) so command lines may rely on bash syntax.
pub fn exec_local(
    script: &str,
    dir: &Path,
    env: &[(String, String)],
) -> Result<ExecOutput, LocalError> {
    let mut child = std::process::Command::new("bash")
        .current_dir(dir)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(LocalError::Spawn)?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(script.as_bytes())
            .map_err(LocalError::Stdin)?;
    }

    let output = child.wait_with_output().map_err(LocalError::Wait)?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Runs exec commands on the local machine.
#[derive(Debug, Clone)]
pub struct LocalHandler {
    project_dir: PathBuf,
}

impl LocalHandler {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    /// Working directory for a command: `workingDir` with `${PROJECT_SOURCE}`
    /// expanded, relative paths taken from the project directory.
    fn working_dir(&self, working_dir: Option<&str>) -> PathBuf {
        match working_dir.filter(|w| !w.is_empty()) {
            None => self.project_dir.clone(),
            Some(w) => {
                let expanded = w.replace(PROJECT_SOURCE, &self.project_dir.to_string_lossy());
                self.project_dir.join(expanded)
            }
        }
    }
}

impl Handler for LocalHandler {
    fn apply_image(&self, component: &Component) -> Result<(), HandlerError> {
        Err(Box::new(LocalError::UnsupportedRequest {
            request: Request::ApplyImage(component.name.clone()).to_string(),
        }))
    }

    fn apply_kubernetes(&self, component: &Component) -> Result<(), HandlerError> {
        Err(Box::new(LocalError::UnsupportedRequest {
            request: Request::ApplyKubernetes(component.name.clone()).to_string(),
        }))
    }

    fn execute(&self, command: &Command) -> Result<(), HandlerError> {
        let CommandKind::Exec(exec) = &command.kind else {
            return Err(Box::new(LocalError::UnsupportedRequest {
                request: Request::Exec(command.id.clone()).to_string(),
            }));
        };
        let script = exec.command_line.as_deref().unwrap_or_default();
        let dir = self.working_dir(exec.working_dir.as_deref());
        let mut env: Vec<(String, String)> = vec![(
            "PROJECT_SOURCE".to_string(),
            self.project_dir.to_string_lossy().into_owned(),
        )];
        env.extend(exec.env.iter().map(|e| (e.name.clone(), e.value.clone())));

        tracing::debug!(command = %command.id, dir = %dir.display(), "running locally");
        let out = exec_local(script, &dir, &env)?;
        if !out.stdout.is_empty() {
            print!("{}", out.stdout);
        }
        if out.success() {
            Ok(())
        } else {
            Err(Box::new(LocalError::Failed {
                id: command.id.clone(),
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(yaml: &str) -> Command {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_tr012_local_echo() {
        let dir = tempfile::tempdir().unwrap();
        let out = exec_local("echo hello", dir.path(), &[]).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_tr012_local_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = exec_local("echo boom >&2; exit 42", dir.path(), &[]).unwrap();
        assert_eq!(out.exit_code, 42);
        assert!(out.stderr.contains("boom"));
    }

    #[test]
    fn test_tr012_local_env_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let env = vec![("GREETING".to_string(), "hi".to_string())];
        let out = exec_local("echo $GREETING; pwd", dir.path(), &env).unwrap();
        let lines: Vec<_> = out.stdout.lines().collect();
        assert_eq!(lines[0], "hi");
        assert!(lines[1].ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_tr012_handler_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let handler = LocalHandler::new(dir.path());
        let cmd = exec(
            "id: touch\nexec:\n  component: c\n  commandLine: touch \"$MARKER\"\n  workingDir: ${PROJECT_SOURCE}/sub\n  env:\n    - {name: MARKER, value: made}\n",
        );
        handler.execute(&cmd).unwrap();
        assert!(dir.path().join("sub/made").exists());
    }

    #[test]
    fn test_tr012_handler_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let handler = LocalHandler::new(dir.path());
        let cmd = exec("id: fail\nexec: {component: c, commandLine: 'echo nope >&2; exit 3'}\n");
        let err = handler.execute(&cmd).unwrap_err();
        assert_eq!(err.to_string(), "command 'fail' exited with code 3: nope");
    }

    #[test]
    fn test_tr012_handler_rejects_cluster_requests() {
        let handler = LocalHandler::new(".");
        let k8s: Component =
            serde_yaml_ng::from_str("name: k\nkubernetes: {inlined: 'kind: Pod'}\n").unwrap();
        let err = handler.apply_kubernetes(&k8s).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
