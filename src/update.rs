// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! The catalog update flow
//!
//! Reconcile, verify the result, then write it and hand the pull request to a
//! sink. Nothing is written and nothing is published unless upstream moved
//! and the reconciled catalog verified cleanly.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::VersionCatalog;
use crate::config::Config;
use crate::error::Result;
use crate::publish::{PullRequest, PullRequestSink};
use crate::reconcile::{ReconcileOutcome, ReconciliationEngine};
use crate::verify::VerificationEngine;

/// How an update run ended
#[derive(Debug)]
pub enum UpdateStatus {
    /// Upstream had nothing new for any entry
    UpToDate,
    /// Dry run: the change was computed and verified but not applied
    Previewed {
        outcome: ReconcileOutcome,
        request: PullRequest,
    },
    /// The change was written to `written` (if any) and published
    Published {
        outcome: ReconcileOutcome,
        request: PullRequest,
        written: Option<PathBuf>,
    },
}

pub struct CatalogUpdater<'a> {
    config: &'a Config,
    reconciler: &'a ReconciliationEngine<'a>,
    verifier: &'a VerificationEngine<'a>,
    sink: &'a dyn PullRequestSink,
}

impl<'a> CatalogUpdater<'a> {
    pub fn new(
        config: &'a Config,
        reconciler: &'a ReconciliationEngine<'a>,
        verifier: &'a VerificationEngine<'a>,
        sink: &'a dyn PullRequestSink,
    ) -> Self {
        Self {
            config,
            reconciler,
            verifier,
            sink,
        }
    }

    /// Bring `catalog` up to date and publish the change
    ///
    /// # Arguments
    /// * `catalog` - The catalog as currently published
    /// * `output` - Where to write the updated document, `None` to skip writing
    ///
    /// # Errors
    /// Reconciliation and verification failures abort before anything is
    /// written; write and sink failures are passed through.
    pub fn update(
        &self,
        catalog: &VersionCatalog,
        output: Option<&Path>,
    ) -> Result<UpdateStatus> {
        let outcome = self.reconciler.reconcile(catalog)?;
        if outcome.is_noop() {
            info!("Catalog is up to date");
            return Ok(UpdateStatus::UpToDate);
        }

        self.verifier.verify(&outcome.catalog)?;
        let request = PullRequest::from_outcome(&outcome);

        if self.config.dry_run {
            info!("On dry-run mode, leaving the catalog and pull request alone");
            return Ok(UpdateStatus::Previewed { outcome, request });
        }

        if let Some(path) = output {
            outcome.catalog.save(path)?;
            info!("Wrote updated catalog to {}", path.display());
        }
        self.sink.open_pull_request(&request)?;

        Ok(UpdateStatus::Published {
            outcome,
            request,
            written: output.map(Path::to_path_buf),
        })
    }
}
