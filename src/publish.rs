// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Pull request text and the sink that opens it
//!
//! Opening the pull request itself (forge API, branch pushing) is left to an
//! external hook program.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::info;

use crate::config::Deadline;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, display_command};
use crate::reconcile::ReconcileOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub title: String,
    pub body: String,
}

impl PullRequest {
    /// Describe a reconciliation outcome as a pull request
    ///
    /// The title lists every change in sorted order; the body links the
    /// release notes of each updated minor version.
    #[must_use]
    pub fn from_outcome(outcome: &ReconcileOutcome) -> Self {
        let changes: Vec<&str> = outcome.changes.iter().map(String::as_str).collect();
        let title = format!("Bump OCP versions {}", changes.join(", "));

        let mut body = String::new();
        for update in &outcome.updates {
            match &update.release_notes_url {
                Some(url) => {
                    body.push_str(&format!("{} release notes: {url}\n", update.version_key));
                }
                None => body.push_str(&format!(
                    "{} has no available release notes\n",
                    update.version_key
                )),
            }
        }

        Self { title, body }
    }
}

/// Receives the pull request for an updated catalog
pub trait PullRequestSink {
    fn open_pull_request(&self, request: &PullRequest) -> Result<()>;
}

/// Sink that only logs the pull request, used when no hook is configured
#[derive(Debug, Default)]
pub struct LogSink;

impl PullRequestSink for LogSink {
    fn open_pull_request(&self, request: &PullRequest) -> Result<()> {
        info!("No pull request hook configured");
        info!("Pull request title: {}", request.title);
        info!("Pull request body:\n{}", request.body);
        Ok(())
    }
}

/// Sink that hands title and body to an external program as two arguments
pub struct HookSink<'a> {
    program: PathBuf,
    runner: &'a dyn CommandRunner,
    deadline: Deadline,
}

impl<'a> HookSink<'a> {
    pub fn new(program: PathBuf, runner: &'a dyn CommandRunner, deadline: Deadline) -> Self {
        Self {
            program,
            runner,
            deadline,
        }
    }
}

impl PullRequestSink for HookSink<'_> {
    fn open_pull_request(&self, request: &PullRequest) -> Result<()> {
        let args = vec![request.title.clone(), request.body.clone()];
        let command = display_command(&self.program, &args[..1]);
        self.deadline.check()?;
        let output = self
            .runner
            .run(&self.program, &args, self.deadline.remaining())
            .map_err(|e| match e.kind() {
                ErrorKind::TimedOut => self.deadline.expired(),
                _ => Error::Configuration(format!(
                    "cannot run pull request hook '{command}': {e}"
                )),
            })?;

        if !output.success() {
            return Err(Error::Resolution {
                target: command,
                attempts: 1,
                message: format!("pull request hook failed: {}", output.stderr.trim()),
            });
        }
        info!("Pull request hook accepted: {}", request.title);
        Ok(())
    }
}
