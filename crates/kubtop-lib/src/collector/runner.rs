//! Process-backed command runner

use super::CommandRunner;
use crate::error::RunError;
use std::process::{Command, Stdio};
use tracing::debug;

/// Longest stderr excerpt kept in an exit error
const STDERR_EXCERPT_LEN: usize = 512;

/// Runs report commands as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], stdout: &mut Vec<u8>) -> Result<(), RunError> {
        debug!(program = %program, args = ?args, "Running report command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    RunError::Spawn {
                        program: program.to_string(),
                        source,
                    }
                }
                _ => RunError::Io {
                    program: program.to_string(),
                    source,
                },
            })?;

        if !output.status.success() {
            return Err(RunError::Exit {
                program: program.to_string(),
                status: output.status,
                stderr: stderr_excerpt(&output.stderr),
            });
        }

        stdout.extend_from_slice(&output.stdout);
        Ok(())
    }
}

/// First line-bounded chunk of stderr, for error messages
fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_EXCERPT_LEN {
        return text.to_string();
    }
    let mut end = STDERR_EXCERPT_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
