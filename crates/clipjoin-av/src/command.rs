//! Builder for running external tools with captured output and an optional
//! time limit.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// How often a time-limited child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of trailing stderr lines kept in failure messages.
const DIAGNOSTIC_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// Both pipes are drained on helper threads while the caller blocks, so a
/// chatty tool can never stall on a full pipe.
///
/// # Example
///
/// ```no_run
/// use clipjoin_av::ToolCommand;
/// use std::time::Duration;
///
/// let output = ToolCommand::new("ffprobe")
///     .args(["-v", "quiet", "-show_format"])
///     .arg("/path/to/video.mp4")
///     .timeout(Some(Duration::from_secs(30)))
///     .execute()?;
/// println!("{}", output.stdout);
/// # Ok::<(), clipjoin_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Limit the execution time; `None` waits indefinitely.
    pub fn timeout(&mut self, limit: Option<Duration>) -> &mut Self {
        self.timeout = limit;
        self
    }

    /// Short name of the program, used in error messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command to completion.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] / [`Error::ToolSpawn`] if the process cannot start.
    /// - [`Error::Timeout`] if the time limit expires (the child is killed).
    /// - [`Error::ToolFailed`] on a non-zero exit, with the tail of stderr.
    pub fn execute(&self) -> Result<ToolOutput> {
        let tool = self.program_name();

        #[cfg(feature = "tracing")]
        tracing::debug!("running {} {:?}", self.program.display(), self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(&tool)
                } else {
                    Error::ToolSpawn {
                        tool: tool.clone(),
                        source: e,
                    }
                }
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit)?,
            None => Some(child.wait()?),
        };

        let Some(status) = status else {
            // Grandchildren may still hold the pipes open; the drain threads
            // are detached and exit once the last writer goes away.
            drop(stdout);
            drop(stderr);
            return Err(Error::Timeout {
                tool,
                after: self.timeout.unwrap_or_default(),
            });
        };

        let output = ToolOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        if !output.status.success() {
            return Err(Error::tool_failed(
                tool,
                format!(
                    "exited with {}: {}",
                    output.status,
                    tail_lines(&output.stderr, DIAGNOSTIC_LINES)
                ),
            ));
        }

        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Wait for the child, killing it once `limit` has passed.
///
/// Returns `None` when the limit expired.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        let now = Instant::now();
        if now >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }

        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Last `n` non-empty lines of `text`, trimmed.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
