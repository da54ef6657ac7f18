use crate::config::CommandTask;
use log::{debug, error, info};
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Runs an external build step (style compiler, deploy) in `cwd` and waits
/// for it.
pub fn run(task: &CommandTask, cwd: &Path) -> Result<(), CommandError> {
    let display = std::iter::once(task.command.as_str())
        .chain(task.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let mut cmd = Command::new(&task.command);
    cmd.args(&task.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Running {} in {:?}", display, cwd);

    let output = cmd.output().map_err(|source| CommandError::Spawn {
        command: display.clone(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("{}", stdout.trim_end());
    }

    if output.status.success() {
        info!("{}", display);
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("Command failed: {}", display);
        Err(CommandError::Failed {
            command: display,
            status: output.status,
            stderr,
        })
    }
}
