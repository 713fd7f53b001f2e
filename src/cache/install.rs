//! Package manager invocation
//!
//! Runs the install procedure as a subprocess, forwarding its output
//! line by line and keeping the tail of stderr for error reports.

use crate::config::schema::InstallConfig;
use crate::error::{NpmCacheError, NpmCacheResult};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Lines of stderr retained for [`NpmCacheError::InstallFailed`]
const OUTPUT_TAIL_LINES: usize = 20;

/// The install procedure of the external package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    program: String,
    args: Vec<String>,
}

impl Installer {
    /// Create an installer running `program args...`
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Installer described by the `[install]` config section
    pub fn from_config(config: &InstallConfig) -> Self {
        Self::new(config.command.clone(), config.args.iter().cloned())
    }

    /// Human-readable command line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the install procedure in `cwd`, blocking until it exits
    pub async fn run(&self, cwd: &Path) -> NpmCacheResult<()> {
        let command = self.command_line();
        info!("Running {} in {}", command, cwd.display());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NpmCacheError::command_failed(command.clone(), e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let forward_stdout = async move {
            if let Some(out) = stdout {
                drain_lines(out, |line| println!("{}", line)).await;
            }
        };

        let collect_stderr = async move {
            let mut tail = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
            if let Some(err) = stderr {
                drain_lines(err, |line| {
                    eprintln!("{}", line);
                    if tail.len() == OUTPUT_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                })
                .await;
            }
            tail
        };

        let (status, (), tail) = tokio::join!(child.wait(), forward_stdout, collect_stderr);
        let status = status.map_err(|e| NpmCacheError::command_failed(command.clone(), e))?;

        if status.success() {
            debug!("{} finished", command);
            return Ok(());
        }

        let output = if tail.is_empty() {
            String::new()
        } else {
            format!("\n{}", Vec::from(tail).join("\n"))
        };

        Err(NpmCacheError::InstallFailed {
            command,
            code: status.code().unwrap_or(-1),
            output,
        })
    }
}

/// Read a child stream to EOF, one line at a time.
///
/// Lines are decoded lossily; the pipe stays open until the child
/// closes it so the child never sees a broken pipe.
async fn drain_lines<R>(stream: R, mut on_line: impl FnMut(String))
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\n', '\r']).to_string());
            }
            Err(e) => {
                debug!("Installer output closed early: {}", e);
                break;
            }
        }
    }
}
