// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Run configuration
//!
//! A `Config` is built once per run (from CLI flags and the environment) and
//! handed by reference to every component constructor.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::platform::{GRAPH_BASE, MIRROR_BASE};
use crate::release_info::RetryPolicy;

/// Environment variable read for registry credentials unless overridden
pub const DEFAULT_PULL_SECRET_ENV: &str = "PULL_SECRET";

/// Value stored as `rhcos_version` when a dry run skips the live ISO inspection
pub const DRY_RUN_RHCOS_VERSION: &str = "8888888";

#[derive(Debug, Clone)]
pub struct Config {
    /// Update graph endpoint
    pub graph_url: String,
    /// Mirror hosting RHCOS builds
    pub mirror_url: String,
    /// Catalog keys exempt from reconciliation and verification
    pub skip_versions: Vec<String>,
    /// Allow fc/rc RHCOS builds to be promoted into the catalog
    pub include_pre_release: bool,
    /// Resolve and diff only, with no side effects
    pub dry_run: bool,
    /// Skip TLS verification for HTTP and pass `--insecure=true` to `oc`
    pub insecure: bool,
    pub oc_binary: PathBuf,
    pub isoinfo_binary: PathBuf,
    /// Docker-config style JSON handed to `oc` as its registry config
    pub registry_credentials: Option<Vec<u8>>,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    /// Limit for a whole reconcile or verify run
    pub run_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph_url: GRAPH_BASE.to_string(),
            mirror_url: MIRROR_BASE.to_string(),
            skip_versions: Vec::new(),
            include_pre_release: false,
            dry_run: false,
            insecure: false,
            oc_binary: PathBuf::from("oc"),
            isoinfo_binary: PathBuf::from("isoinfo"),
            registry_credentials: None,
            retry: RetryPolicy::default(),
            http_timeout: Duration::from_secs(60),
            run_timeout: None,
        }
    }
}

impl Config {
    /// Whether a catalog key is on the skip-list
    #[must_use]
    pub fn is_skipped(&self, version_key: &str) -> bool {
        self.skip_versions.iter().any(|v| v == version_key)
    }

    /// Start the clock for a run; call once and share the result
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::new(self.run_timeout)
    }
}

/// Read registry credentials from an environment variable
///
/// Unset or empty variables mean "no credentials"; the contents are validated
/// when they are first used.
pub fn registry_credentials_from_env(var: &str) -> Option<Vec<u8>> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(|v| v.into_encoded_bytes())
}

/// Wall-clock budget for one run
///
/// Created once per run and copied into every component, so all stages of
/// a run draw on one budget.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// A deadline that never expires
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Time left before the limit, `None` when the run is unlimited
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    /// Fail once the budget is spent
    ///
    /// # Errors
    /// Returns `Error::Timeout` when the limit has passed
    pub fn check(&self) -> Result<()> {
        match self.remaining() {
            Some(left) if left.is_zero() => Err(self.expired()),
            _ => Ok(()),
        }
    }

    /// The error reported when the budget ran out
    #[must_use]
    pub fn expired(&self) -> Error {
        Error::Timeout {
            elapsed_secs: self.started.elapsed().as_secs(),
        }
    }
}
