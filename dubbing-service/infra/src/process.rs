use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use dubbing_domain::DomainError;
use tokio::process::Command;

const STDERR_TAIL_CHARS: usize = 2_000;

/// Runs external tools with a hard time limit. The child is killed if the
/// limit passes or the calling future is dropped.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn command_exists(program: &str) -> bool {
        which::which(program).is_ok()
    }

    /// Runs `program`, failing on spawn errors, timeouts and non-zero exits.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<Output, DomainError> {
        let output = self.run_unchecked(program, args, cwd).await?;
        if output.status.success() {
            return Ok(output);
        }
        Err(DomainError::external_service_error(
            program,
            &format!(
                "exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            ),
        ))
    }

    /// Like [`run`](Self::run) but hands back the output whatever the exit status.
    pub async fn run_unchecked(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<Output, DomainError> {
        if !Self::command_exists(program) {
            return Err(DomainError::external_service_error(
                program,
                "command not found on PATH",
            ));
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        tracing::debug!(program = program, args = %args.join(" "), "spawning process");
        let child = command.spawn().map_err(|err| {
            DomainError::external_service_error(program, &format!("spawn failed: {err}"))
        })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(DomainError::external_service_error(
                program,
                &format!("wait failed: {err}"),
            )),
            Err(_) => Err(DomainError::external_service_error(
                program,
                &format!("timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}

pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let char_count = text.chars().count();
    if char_count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(char_count - STDERR_TAIL_CHARS).collect()
}
