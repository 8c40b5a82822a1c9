// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! External command execution

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::warn;

/// How often a running child is polled while a time limit applies
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs on behalf of the inspectors
pub trait CommandRunner {
    /// Run `program` with `args` to completion and capture its output
    ///
    /// # Arguments
    /// * `limit` - Longest the program may run, `None` for no limit
    ///
    /// # Errors
    /// `io::ErrorKind::NotFound` when the program cannot be located,
    /// `io::ErrorKind::TimedOut` when it outlived `limit` (it is killed),
    /// or any other spawn error as-is.
    fn run(
        &self,
        program: &Path,
        args: &[String],
        limit: Option<Duration>,
    ) -> io::Result<CommandOutput>;
}

/// `CommandRunner` that spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        limit: Option<Duration>,
    ) -> io::Result<CommandOutput> {
        let resolved = which::which(program).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: {e}", program.display()),
            )
        })?;

        let mut child = Command::new(resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained on their own threads so a chatty child never blocks on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let code = match limit {
            Some(limit) => wait_with_limit(&mut child, limit, program)?,
            None => child.wait()?.code(),
        };

        Ok(CommandOutput {
            code,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

fn wait_with_limit(
    child: &mut Child,
    limit: Duration,
    program: &Path,
) -> io::Result<Option<i32>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.code());
        }
        let elapsed = started.elapsed();
        if elapsed >= limit {
            warn!("{} still running after {limit:?}, killing it", program.display());
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} timed out after {limit:?}", program.display()),
            ));
        }
        thread::sleep(POLL_INTERVAL.min(limit - elapsed));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Render a command line for diagnostics
pub fn display_command(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
