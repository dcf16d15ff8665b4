//! Command probe implementation.
//!
//! Commands run through the platform shell with stdout and stderr piped. The child
//! is killed if it outlives its timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{enforce_timeout, AssertionFailure, Outcome, ProbeError, RunBudget};
use crate::catalog::{CommandTarget, OutputExpectation, ProbeSpec};

/// Text a command printed: stdout followed by stderr.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub text: String,
}

impl CommandOutput {
    fn from_pipes(stdout: &[u8], stderr: &[u8]) -> Self {
        let mut text = String::from_utf8_lossy(stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(stderr));
        Self { text }
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

fn shell_command(command: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    if let Some(pipe) = pipe {
        // Bytes read before an error stay in `buf`
        let _ = pipe.read_to_end(buf).await;
    }
}

/// Run a shell command, returning everything it printed and how it ended.
///
/// Output is kept even when the command exits non-zero or is killed on timeout.
pub async fn run_shell(command: &str, timeout: Duration) -> (CommandOutput, Result<(), ProbeError>) {
    let mut child = match shell_command(command).spawn() {
        Ok(child) => child,
        Err(e) => {
            return (
                CommandOutput::default(),
                Err(ProbeError::Command(format!("failed to execute '{}': {}", command, e))),
            )
        }
    };

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out = Vec::new();
    let mut err = Vec::new();

    let finished = tokio::time::timeout(timeout, async {
        let (status, _, _) = tokio::join!(
            child.wait(),
            read_pipe(stdout.as_mut(), &mut out),
            read_pipe(stderr.as_mut(), &mut err),
        );
        status
    })
    .await;

    let status = match finished {
        Ok(status) => status,
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return (CommandOutput::from_pipes(&out, &err), Err(ProbeError::Timeout(timeout)));
        }
    };

    let output = CommandOutput::from_pipes(&out, &err);
    let result = match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            let code = status
                .code()
                .map_or_else(|| "signal".to_string(), |code| code.to_string());
            Err(ProbeError::Command(format!(
                "exited with status {}: {}",
                code,
                output.trimmed()
            )))
        }
        Err(e) => Err(ProbeError::Command(format!("failed to collect output: {}", e))),
    };
    (output, result)
}

/// Run a shell command and collect its output.
///
/// A non-zero exit status is an error carrying whatever the command printed.
pub async fn capture_output(command: &str, timeout: Duration) -> Result<CommandOutput, ProbeError> {
    let (output, result) = run_shell(command, timeout).await;
    result.map(|()| output)
}

/// Match command output against an expectation.
pub fn check_output(expect: &OutputExpectation, text: &str) -> Result<(), AssertionFailure> {
    let trimmed = text.trim();
    let matched = match expect {
        OutputExpectation::GreaterThan(threshold) => trimmed
            .parse::<i64>()
            .map(|value| value > *threshold)
            .unwrap_or(false),
        OutputExpectation::Contains(needle) => text.contains(needle.as_str()),
        OutputExpectation::Matches(re) => re.is_match(text),
    };

    if matched {
        Ok(())
    } else {
        Err(AssertionFailure::OutputMismatch {
            expected: expect.to_string(),
            actual: trimmed.to_string(),
        })
    }
}

/// Run a command probe within the run budget.
pub async fn run_command_probe(spec: &ProbeSpec, target: &CommandTarget, budget: &RunBudget) -> Outcome {
    let start = Instant::now();

    let run = budget
        .guard(async { Ok::<_, ProbeError>(run_shell(&target.command, spec.timeout).await) })
        .await;
    let elapsed = start.elapsed();
    let (output, result) = match run {
        Ok(run) => run,
        Err(e) => return Outcome::failed(&spec.name, elapsed, Value::Null, &e),
    };
    let observed = Value::String(output.trimmed().to_string());

    // Spawning happens outside the timer, so the deadline is checked again here
    let checked = result
        .and_then(|()| enforce_timeout(elapsed, spec.timeout))
        .and_then(|()| check_output(&target.expect, &output.text).map_err(ProbeError::from));

    match checked {
        Ok(()) => Outcome::passed(&spec.name, elapsed, observed, Vec::new()),
        Err(e) => Outcome::failed(&spec.name, elapsed, observed, &e),
    }
}
