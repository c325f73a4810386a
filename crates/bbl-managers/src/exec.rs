use crate::ManagerError;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run an external tool to completion and return its stdout.
///
/// Only the tool name and subcommand are logged: the remaining arguments
/// routinely carry credentials.
pub(crate) fn run_tool(
    bin: &str,
    args: &[&str],
    dir: Option<&Path>,
    envs: &[(&str, &str)],
) -> Result<String, ManagerError> {
    debug!("running {bin} {}", args.first().copied().unwrap_or(""));

    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = cmd.output().map_err(|e| ManagerError::ExecFailed {
        tool: bin.to_owned(),
        message: format!("failed to start: {e}"),
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("exited with code {}", output.status.code().unwrap_or(1)),
            trimmed => trimmed.to_owned(),
        };
        Err(ManagerError::ExecFailed {
            tool: bin.to_owned(),
            message,
        })
    }
}

/// Write a file readable only by the current user.
pub(crate) fn write_secret(path: &Path, content: &str) -> Result<(), ManagerError> {
    let mut options = fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Write an executable shell script standing in for an external tool.
#[cfg(all(test, unix))]
pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
