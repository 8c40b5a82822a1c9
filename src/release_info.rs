// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Release image inspection through `oc adm release info`
//!
//! The version embedded in a release image's metadata is the authoritative
//! answer to "which OpenShift build is this image". Reading it requires the
//! `oc` binary and, for private registries, a registry config file built from
//! the pull secret.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::{Config, Deadline};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, display_command};

/// How often and how patiently a failing external call is retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Decides whether an attempt's error is worth another attempt
    pub retryable: fn(&Error) -> bool,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 5;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    /// Retry up to `max_attempts` times without sleeping in between
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts
    ///
    /// `target` names what is being resolved in the final error.
    pub fn run<T>(
        &self,
        target: &str,
        deadline: &Deadline,
        mut op: impl FnMut(u32) -> Result<T>,
    ) -> Result<T> {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            deadline.check()?;
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if (self.retryable)(&e) => {
                    warn!("attempt {attempt}/{attempts} for {target} failed: {e}");
                    last_error = Some(e);
                    if attempt < attempts && !self.delay.is_zero() {
                        let pause = deadline
                            .remaining()
                            .map_or(self.delay, |left| left.min(self.delay));
                        thread::sleep(pause);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Resolution {
            target: target.to_string(),
            attempts,
            message: last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string()),
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_ATTEMPTS,
            delay: Self::DEFAULT_DELAY,
            retryable: Error::is_transient,
        }
    }
}

/// Reads the exact OpenShift version out of a release image
pub struct ReleaseInfoInspector<'a> {
    runner: &'a dyn CommandRunner,
    oc_binary: PathBuf,
    insecure: bool,
    retry: RetryPolicy,
    deadline: Deadline,
}

impl<'a> ReleaseInfoInspector<'a> {
    /// # Arguments
    /// * `deadline` - Budget of the surrounding run; each `oc` call is killed
    ///   once it runs out
    pub fn new(config: &Config, runner: &'a dyn CommandRunner, deadline: Deadline) -> Self {
        Self {
            runner,
            oc_binary: config.oc_binary.clone(),
            insecure: config.insecure,
            retry: config.retry,
            deadline,
        }
    }

    /// Budget this inspector runs under
    #[must_use]
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Return the version string `release_image` reports about itself
    ///
    /// # Arguments
    /// * `release_image` - Pull spec of the release image
    /// * `registry_credentials` - Optional docker-config JSON for the registry
    ///
    /// # Errors
    /// `Error::Configuration` for malformed credentials or a missing `oc`
    /// binary; `Error::Resolution` once every attempt has failed.
    pub fn inspect(
        &self,
        release_image: &str,
        registry_credentials: Option<&[u8]>,
    ) -> Result<String> {
        // Lives until the end of this call, covering every attempt
        let registry_config = registry_credentials
            .map(write_registry_config)
            .transpose()?;

        let mut args: Vec<String> = [
            "adm",
            "release",
            "info",
            "-o",
            "template",
            "--template",
            "{{.metadata.version}}",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        args.push(format!("--insecure={}", self.insecure));
        args.push(release_image.to_string());
        if let Some(file) = &registry_config {
            args.push(format!("--registry-config={}", file.path().display()));
        }

        self.retry.run(release_image, &self.deadline, |attempt| {
            debug!(
                "inspecting {release_image} (attempt {attempt}): {}",
                display_command(&self.oc_binary, &args)
            );
            self.run_once(&args)
        })
    }

    fn run_once(&self, args: &[String]) -> Result<String> {
        let command = display_command(&self.oc_binary, args);
        let output = self
            .runner
            .run(&self.oc_binary, args, self.deadline.remaining())
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    Error::Configuration(format!("cannot run '{command}': {e}"))
                }
                ErrorKind::TimedOut => self.deadline.expired(),
                _ => Error::Transient {
                    target: command.clone(),
                    message: e.to_string(),
                },
            })?;
        // A runner may only notice the limit after the fact
        self.deadline.check()?;

        if !output.success() {
            let code = output
                .code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(Error::Transient {
                target: command,
                message: format!("exit code {code}: {}", output.stderr.trim()),
            });
        }

        Ok(output.stdout.trim().trim_matches('\'').to_string())
    }
}

/// Validate registry credentials and write them to a private temp file
///
/// # Errors
/// `Error::Configuration` unless the credentials are a JSON object
pub fn write_registry_config(credentials: &[u8]) -> Result<NamedTempFile> {
    let parsed: serde_json::Value = serde_json::from_slice(credentials).map_err(|e| {
        Error::Configuration(format!("registry credentials are not valid JSON: {e}"))
    })?;
    if !parsed.is_object() {
        return Err(Error::Configuration(
            "registry credentials must be a JSON object".to_string(),
        ));
    }

    let mut file = tempfile::Builder::new()
        .prefix("registry-config")
        .tempfile()?;
    file.write_all(credentials)?;
    file.flush()?;
    Ok(file)
}
