// Test helpers for exercising docker-driven code without a docker daemon
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::docker::{CommandOutput, CommandRunner};
use crate::error::Result;

/// One invocation seen by [`RecordingRunner`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl RecordedCall {
    pub fn command_line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Records every command and replays scripted outputs in order.
/// Once the script is exhausted every command succeeds with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<CommandOutput>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&self, stdout: &str) {
        self.responses.lock().unwrap().push_back(CommandOutput {
            status: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        });
    }

    pub fn push_failure(&self, stderr: &str) {
        self.responses.lock().unwrap().push_back(CommandOutput {
            status: Some(1),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            stdin: stdin.map(<[u8]>::to_vec),
        });

        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CommandOutput {
                status: Some(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }))
    }
}
