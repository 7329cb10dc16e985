use super::commands::{build_plan, ConversionPlan, Invocation};
use super::progress::{RunEvent, RunSummary};
use crate::error::{JobError, RunError};
use crate::project::{ConversionMode, EncodingParameters};
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Lines of output kept in a fatal error for display.
const OUTPUT_TAIL_LINES: usize = 20;

/// Exit status and the last lines of combined output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub output: Vec<String>,
}

/// Append `line`, dropping the oldest once `OUTPUT_TAIL_LINES` are held.
fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == OUTPUT_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

/// Splits a byte stream into lines on `\n`, `\r` or `\r\n`.
///
/// FFmpeg rewrites its status line in place with `\r`, so treating a bare
/// carriage return as a line end is what makes progress visible live.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    last_was_cr: bool,
}

impl LineSplitter {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            match byte {
                b'\n' if self.last_was_cr => self.last_was_cr = false,
                b'\r' | b'\n' => {
                    lines.push(String::from_utf8_lossy(&self.pending).to_string());
                    self.pending.clear();
                    self.last_was_cr = byte == b'\r';
                }
                _ => {
                    self.pending.push(byte);
                    self.last_was_cr = false;
                }
            }
        }
        lines
    }

    /// Whatever is left after the stream closed without a final newline.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).to_string())
        }
    }
}

fn log_line(events: &Sender<RunEvent>, line: String) {
    // The UI may have gone away; the run still finishes and cleans up.
    let _ = events.send(RunEvent::Log(line));
}

async fn forward_lines<R>(mut reader: R, lines: mpsc::UnboundedSender<String>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::default();
    let mut chunk = [0u8; 4096];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        for line in splitter.push(&chunk[..read]) {
            let _ = lines.send(line);
        }
    }
    if let Some(line) = splitter.finish() {
        let _ = lines.send(line);
    }
    Ok(())
}

/// Launch one invocation and stream its stdout and stderr, merged, to the log.
pub async fn run_invocation(invocation: &Invocation, events: &Sender<RunEvent>) -> Result<RunResult, RunError> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = cmd.spawn().map_err(|source| RunError::Launch {
        program: invocation.program.to_string_lossy().to_string(),
        source,
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("Failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("Failed to capture stderr"))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stdout_task = tokio::spawn(forward_lines(stdout, tx.clone()));
    let stderr_task = tokio::spawn(forward_lines(stderr, tx));

    // Ends once both readers hit EOF and drop their senders
    let mut output = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
    while let Some(line) = rx.recv().await {
        log_line(events, line.clone());
        push_tail(&mut output, line);
    }

    stdout_task.await.map_err(io::Error::other)??;
    stderr_task.await.map_err(io::Error::other)??;

    let status = child.wait().await?;
    Ok(RunResult {
        exit_code: status.code(),
        success: status.success(),
        output: output.into(),
    })
}

/// Execute the plan's invocations strictly in order.
///
/// A failure of an invocation marked `may_fail` is logged and skipped; any
/// other failure stops the run immediately.
pub async fn run_plan(plan: &ConversionPlan, events: &Sender<RunEvent>) -> Result<Vec<RunResult>, RunError> {
    let total = plan.invocations.len();
    let mut results = Vec::with_capacity(total);

    for (index, invocation) in plan.invocations.iter().enumerate() {
        let _ = events.send(RunEvent::StepStarted { index, total });
        let command_line = invocation.command_line();
        tracing::debug!("Step {}/{}: {}", index + 1, total, command_line);
        log_line(events, String::new());
        log_line(events, format!("$ {}", command_line));

        match run_invocation(invocation, events).await {
            Ok(result) if result.success => results.push(result),
            Ok(result) => {
                let error = RunError::StepFailed {
                    code: result.exit_code,
                    output: result.output.clone(),
                };
                if !invocation.may_fail {
                    return Err(error);
                }
                tracing::warn!("Optional step {} failed: {}", index + 1, error);
                log_line(events, format!("(non-fatal) {}", error));
                results.push(result);
            }
            Err(error) if invocation.may_fail => {
                tracing::warn!("Optional step {} failed: {}", index + 1, error);
                log_line(events, format!("(non-fatal) {}", error));
            }
            Err(error) => return Err(error),
        }
    }

    Ok(results)
}

/// Build and run one conversion, then report `Finished`.
///
/// Scratch files are removed before `Finished` is sent, whatever the outcome.
pub async fn run_job(
    mode: ConversionMode,
    params: EncodingParameters,
    ffmpeg: PathBuf,
    events: Sender<RunEvent>,
) {
    let started = Instant::now();
    tracing::info!("Starting {} conversion", mode.name());

    let outcome = execute(mode, &params, ffmpeg, &events, started).await;
    match &outcome {
        Ok(summary) => tracing::info!(
            "{} finished: {} step(s), {} optional failure(s), {:?}",
            mode.name(),
            summary.steps,
            summary.failed_optional_steps,
            summary.elapsed
        ),
        Err(e) => tracing::error!("{} failed: {}", mode.name(), e),
    }

    let _ = events.send(RunEvent::Finished(outcome));
}

async fn execute(
    mode: ConversionMode,
    params: &EncodingParameters,
    ffmpeg: PathBuf,
    events: &Sender<RunEvent>,
    started: Instant,
) -> Result<RunSummary, JobError> {
    let plan = build_plan(mode, params, &ffmpeg)?;
    let steps = plan.invocations.len();

    let outcome = run_plan(&plan, events).await;

    if let Err(e) = plan.close() {
        tracing::warn!("Failed to remove temporary files: {}", e);
        log_line(events, format!("Warning: failed to remove temporary files: {}", e));
    }

    let results = outcome?;
    let succeeded = results.iter().filter(|r| r.success).count();
    Ok(RunSummary {
        steps,
        failed_optional_steps: steps - succeeded,
        elapsed: started.elapsed(),
    })
}
