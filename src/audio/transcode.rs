//! Conversion of downloaded voice notes to PCM WAV via an external tool.
//!
//! The invocation is `<program> -y -i <input> [format args] <output>`;
//! `-y` makes the converter overwrite `output` unconditionally.  The optional
//! format arguments pin the output to what the recognizer accepts.

use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::config::TranscodeConfig;

/// Errors from a single conversion.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        /// Last lines of the converter's stderr.
        stderr: String,
    },

    #[error("{program} did not finish within {after:?}")]
    Timeout { program: String, after: Duration },
}

/// Runs the configured converter.
#[derive(Debug, Clone)]
pub struct Transcoder {
    program: String,
    sample_rate: Option<u32>,
    timeout: Duration,
}

impl Transcoder {
    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self {
            program: config.program.clone(),
            sample_rate: config.sample_rate,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full argument list for converting `input` into `output`.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
        if let Some(rate) = self.sample_rate {
            let rate = rate.to_string();
            for arg in ["-ac", "1", "-ar", rate.as_str(), "-c:a", "pcm_s16le"] {
                args.push(arg.into());
            }
        }
        args.push(output.into());
        args
    }

    /// Convert `input` into `output`.  Success means exit code 0; whether
    /// `output` actually exists is left to the caller.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let run = Command::new(&self.program)
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| TranscodeError::Timeout {
                program: self.program.clone(),
                after: self.timeout,
            })?
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                program: self.program.clone(),
                status: result.status,
                stderr: stderr_tail(&result.stderr),
            });
        }

        log::info!(
            "transcode: {} converted to {}",
            input.display(),
            output.display()
        );
        Ok(())
    }
}

/// The last three non-empty stderr lines, where ffmpeg puts the actual error.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let mut lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .rev()
        .take(3)
        .collect();
    lines.reverse();
    lines.join(" | ")
}

/// Write an executable shell script standing in for the converter.
///
/// It receives the same arguments as the real tool, so `$3` is the input
/// and the last argument is the output.
#[cfg(all(test, unix))]
pub(crate) fn fake_converter(dir: &Path, body: &str) -> std::path::PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg.sh");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
