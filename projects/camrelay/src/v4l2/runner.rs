use std::{process::Stdio, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{process::Command, time::timeout};

pub const DEFAULT_PROGRAM: &str = "v4l2-ctl";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Captured result of one device-control utility invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CtlOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CtlOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stderr, else stdout, else `fallback`.
    pub fn failure_message(&self, fallback: &str) -> String {
        [&self.stderr, &self.stdout]
            .into_iter()
            .map(|text| text.trim())
            .find(|text| !text.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[async_trait]
pub trait CtlRunner: Send + Sync {
    /// Runs the utility. A non-zero exit or a timeout is reported through
    /// [`CtlOutput::code`]; `Err` means the utility could not be run at all.
    async fn run(&self, args: &[&str]) -> Result<CtlOutput>;
}

#[derive(Debug, Clone)]
pub struct V4l2Ctl {
    program: String,
    timeout: Duration,
}

impl V4l2Ctl {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_owned(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for V4l2Ctl {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CtlRunner for V4l2Ctl {
    async fn run(&self, args: &[&str]) -> Result<CtlOutput> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program))?;

        let Ok(output) = timeout(self.timeout, child.wait_with_output()).await else {
            return Ok(CtlOutput {
                code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: format!(
                    "Timeout running {} {} after {:?}",
                    self.program,
                    args.join(" "),
                    self.timeout
                ),
            });
        };
        let output = output.with_context(|| format!("failed to wait for {}", self.program))?;

        Ok(CtlOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
