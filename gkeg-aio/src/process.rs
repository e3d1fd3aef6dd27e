// gkeg-aio/src/process.rs
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use gkeg_common::error::{GkegError, Result};
use tracing::{debug, error};

/// Runs an external command to completion and captures its output.
///
/// The returned `Output` is handed back whatever the exit status; callers decide
/// what a failure means. Only spawn errors become `Err`. When `envs` is given it
/// replaces the inherited environment instead of extending it.
pub fn run_command(
    command: &str,
    args: &[String],
    cwd: Option<&Path>,
    envs: Option<&BTreeMap<String, String>>,
) -> Result<Output> {
    debug!(
        "Running command: {} {:?} (cwd: {:?}, envs: {:?})",
        command,
        args,
        cwd,
        envs.map(|e| e.keys().collect::<Vec<_>>()) // Log only keys for envs
    );

    let mut cmd = Command::new(command);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if let Some(env_map) = envs {
        cmd.env_clear();
        cmd.envs(env_map);
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null()); // Prevent hanging on stdin

    match cmd.output() {
        Ok(output) => {
            if !output.status.success() {
                debug!("Command failed with status: {}", output.status);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stdout.trim().is_empty() {
                    debug!("Stdout:\n{}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Command finished successfully.");
            }
            Ok(output)
        }
        Err(e) => {
            error!("Failed to execute command '{}': {}", command, e);
            Err(GkegError::CommandExecError(format!(
                "Failed to execute '{command}': {e}"
            )))
        }
    }
}

/// Joins captured stdout and stderr for error reports, keeping only the tail.
pub fn combined_output(output: &Output, max_lines: usize) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_and_environment() {
        let mut envs = BTreeMap::new();
        envs.insert("GKEG_PROBE".to_string(), "hello".to_string());
        envs.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        let output = run_command(
            "sh",
            &["-c".to_string(), "echo $GKEG_PROBE; echo oops >&2; exit 3".to_string()],
            None,
            Some(&envs),
        )
        .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(combined_output(&output, 10), "hello\noops");
        assert_eq!(combined_output(&output, 1), "oops");
    }

    #[test]
    fn explicit_environment_replaces_inherited_one() {
        std::env::set_var("GKEG_LEAKED_PROBE", "leaked");
        let mut envs = BTreeMap::new();
        envs.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        let output = run_command(
            "/bin/sh",
            &["-c".to_string(), "echo \"[$GKEG_LEAKED_PROBE]\"".to_string()],
            None,
            Some(&envs),
        )
        .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "[]");
    }

    #[test]
    fn missing_program_is_an_exec_error() {
        let err = run_command("gkeg-definitely-not-a-program", &[], None, None).unwrap_err();
        assert!(matches!(err, GkegError::CommandExecError(_)));
    }
}
