/*
 *  Copyright 2026 Process Orchestrator Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Task Executor.
//!
//! Runs one already placeholder-substituted command as a subprocess:
//! - Whitespace-splits `command` into argv; no shell interpretation.
//! - Changes working directory before launch if configured.
//! - Merges stderr into stdout.
//! - Waits up to `timeout_minutes`; forcibly kills the child on expiry.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

/// Cap on captured combined stdout/stderr. A runaway task's output is
/// truncated rather than held in memory without limit; the truncation
/// is noted with a trailing marker.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;
const TRUNCATION_MARKER: &str = "\n... [output truncated]";

/// Outcome of running one task to completion (or timeout/launch failure).
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub error_message: Option<String>,
}

impl ExecutionOutcome {
    fn success(exit_code: i32, output: String) -> Self {
        Self {
            success: true,
            exit_code: Some(exit_code),
            output,
            error_message: None,
        }
    }

    fn failure(exit_code: Option<i32>, output: String, error_message: String) -> Self {
        Self {
            success: false,
            exit_code,
            output,
            error_message: Some(error_message),
        }
    }
}

/// One runnable unit handed to [`execute`]: an already placeholder-substituted
/// command plus the settings from its `TaskInstance`.
#[derive(Debug, Clone)]
pub struct ExecutableTask {
    pub command: String,
    pub working_directory: Option<String>,
    pub timeout_minutes: i64,
}

/// Decodes captured bytes as UTF-8 (lossily) and truncates to
/// [`MAX_OUTPUT_BYTES`], appending [`TRUNCATION_MARKER`] when cut.
fn truncate_output(bytes: &[u8]) -> String {
    if bytes.len() <= MAX_OUTPUT_BYTES {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut truncated = String::from_utf8_lossy(&bytes[..MAX_OUTPUT_BYTES]).into_owned();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Runs `task.command` to completion, applying the configured timeout
/// and bounded output capture.
pub async fn execute(task: &ExecutableTask) -> ExecutionOutcome {
    let mut parts = task.command.split_whitespace();
    let program = match parts.next() {
        Some(p) => p,
        None => {
            return ExecutionOutcome::failure(
                None,
                String::new(),
                "command is empty after whitespace splitting".to_string(),
            )
        }
    };
    let args: Vec<&str> = parts.collect();

    let mut cmd = Command::new(program);
    cmd.args(&args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    if let Some(dir) = &task.working_directory {
        cmd.current_dir(dir);
    }

    debug!(command = %task.command, "launching task subprocess");

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecutionOutcome::failure(None, String::new(), e.to_string());
        }
    };

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");
    let timeout = Duration::from_secs((task.timeout_minutes.max(0) as u64) * 60);

    let run = async {
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        // Read both streams concurrently: the child can fill one pipe's OS
        // buffer and block on write while we're only draining the other.
        let (_, _, status) = tokio::join!(
            stdout.read_to_end(&mut stdout_buf),
            stderr.read_to_end(&mut stderr_buf),
            child.wait(),
        );
        stdout_buf.extend_from_slice(&stderr_buf);
        (status, stdout_buf)
    };

    match time::timeout(timeout, run).await {
        Ok((status, output_bytes)) => {
            let output = truncate_output(&output_bytes);
            match status {
                Ok(exit_status) => match exit_status.code() {
                    Some(0) => ExecutionOutcome::success(0, output),
                    Some(code) => ExecutionOutcome::failure(
                        Some(code),
                        output.clone(),
                        format!("Task failed with exit code {code}\nOutput: {output}"),
                    ),
                    None => ExecutionOutcome::failure(
                        None,
                        output.clone(),
                        format!("Task terminated by signal\nOutput: {output}"),
                    ),
                },
                Err(e) => ExecutionOutcome::failure(None, output, e.to_string()),
            }
        }
        Err(_) => {
            warn!(
                command = %task.command,
                timeout_minutes = task.timeout_minutes,
                "task exceeded its timeout; killing subprocess"
            );
            // `run` only borrowed `child`; it is still alive here and must
            // be killed explicitly (`kill_on_drop` only fires when the
            // `Child` value itself is dropped, which hasn't happened yet).
            let _ = child.kill().await;
            ExecutionOutcome::failure(
                None,
                String::new(),
                format!("Task timed out after {} minutes", task.timeout_minutes),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_exit_zero() {
        let task = ExecutableTask {
            command: "true".to_string(),
            working_directory: None,
            timeout_minutes: 1,
        };
        let outcome = execute(&task).await;
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure_with_code_in_message() {
        let task = ExecutableTask {
            command: "false".to_string(),
            working_directory: None,
            timeout_minutes: 1,
        };
        let outcome = execute(&task).await;
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome
            .error_message
            .unwrap()
            .contains("exit code 1"));
    }

    #[tokio::test]
    async fn missing_program_is_launch_failure() {
        let task = ExecutableTask {
            command: "this-binary-does-not-exist-anywhere".to_string(),
            working_directory: None,
            timeout_minutes: 1,
        };
        let outcome = execute(&task).await;
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, None);
    }

    #[tokio::test]
    async fn captures_stdout() {
        let task = ExecutableTask {
            command: "echo hello-world".to_string(),
            working_directory: None,
            timeout_minutes: 1,
        };
        let outcome = execute(&task).await;
        assert!(outcome.success);
        assert!(outcome.output.contains("hello-world"));
    }

    #[test]
    fn truncate_output_passes_short_input_through() {
        let out = truncate_output(b"hello");
        assert_eq!(out, "hello");
    }

    #[test]
    fn truncate_output_caps_and_marks_long_input() {
        let bytes = vec![b'a'; MAX_OUTPUT_BYTES + 10];
        let out = truncate_output(&bytes);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert!(out.len() < bytes.len());
    }
}
