// Helper functions for backend implementations

use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::errors::DownloadError;

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Run a command to completion, racing it against a timeout and a cancellation token.
///
/// The child is killed if either fires first. A binary that cannot be found
/// maps to `DownloadError::ToolNotFound` so it surfaces as a per-link failure.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<Output, DownloadError> {
    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }

    debug!(program, args = %args.join(" "), "spawning");

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
            _ => DownloadError::spawn(program, e),
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::spawn(program, "stdout was not captured"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::spawn(program, "stderr was not captured"))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = tokio::select! {
        res = timeout(limit, child.wait()) => match res {
            Ok(status) => Waited::Exited(status),
            Err(_) => Waited::TimedOut,
        },
        _ = cancel.cancelled() => Waited::Cancelled,
    };

    let status = match waited {
        Waited::Exited(status) => status.map_err(|e| DownloadError::spawn(program, e))?,
        interrupted => {
            if let Err(e) = child.kill().await {
                warn!(program, error = %e, "failed to kill child process");
            }
            stdout_task.abort();
            stderr_task.abort();
            return Err(match interrupted {
                Waited::TimedOut => DownloadError::Timeout(limit),
                _ => DownloadError::Cancelled,
            });
        }
    };

    let stdout = stdout_task
        .await
        .map_err(|e| DownloadError::spawn(program, e))?
        .map_err(|e| DownloadError::spawn(program, e))?;
    let stderr = stderr_task
        .await
        .map_err(|e| DownloadError::spawn(program, e))?
        .map_err(|e| DownloadError::spawn(program, e))?;

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Turn a finished process into `Ok(())` or a failure carrying stderr / exit code
pub fn check_output(output: &Output) -> Result<(), DownloadError> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return Err(DownloadError::Failed(stderr));
    }

    let code = output
        .status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    Err(DownloadError::Failed(format!("Process exited with code {}", code)))
}

/// Best-effort: reveal a directory in the platform file manager
pub fn open_folder(path: &Path) {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };

    match spawn_detached(program, path) {
        Ok(_) => debug!(path = %path.display(), "opened output folder"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not open output folder"),
    }
}

/// Spawn `program <path>` without waiting on it; a background task reaps the child.
pub(crate) fn spawn_detached(
    program: &str,
    path: &Path,
) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = TokioCommand::new(program)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let program = program.to_string();
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                debug!(program, %status, "detached process exited");
                Some(status)
            }
            Err(e) => {
                warn!(program, error = %e, "failed to wait on detached process");
                None
            }
        }
    }))
}

/// Add `--cookies-from-browser <browser>` when configured
pub fn push_cookie_args(args: &mut Vec<String>, browser: Option<&str>) {
    if let Some(browser) = browser.filter(|b| !b.trim().is_empty()) {
        args.push("--cookies-from-browser".to_string());
        args.push(browser.to_string());
    }
}
