// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Catalog reconciliation against upstream releases
//!
//! Each entry is compared with the newest OpenShift release in the update
//! graph and the newest RHCOS build on the mirror. Entries with nothing newer
//! upstream are carried over untouched, so an update only ever touches the
//! entries that actually moved.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{VersionCatalog, VersionEntry};
use crate::config::{Config, DRY_RUN_RHCOS_VERSION, Deadline};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::graph::UpstreamReleaseResolver;
use crate::http::Fetcher;
use crate::rhcos::{
    LiveIsoInspector, UpstreamRhcosResolver, build_id_from_url, rebuild_artifact_url,
};

/// One catalog entry that changed during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub version_key: String,
    /// Release notes of the new OpenShift release, if it moved and has any
    pub release_notes_url: Option<String>,
}

/// Result of one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub catalog: VersionCatalog,
    /// Human-readable change descriptions, e.g. "4.11: release 4.11.5 -> 4.11.7"
    pub changes: BTreeSet<String>,
    /// Changed entries in catalog order
    pub updates: Vec<EntryUpdate>,
    pub generated_at: DateTime<Utc>,
}

impl ReconcileOutcome {
    /// True when upstream had nothing new for any entry
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

pub struct ReconciliationEngine<'a> {
    config: &'a Config,
    deadline: Deadline,
    releases: UpstreamReleaseResolver<'a>,
    rhcos: UpstreamRhcosResolver<'a>,
    live_iso: LiveIsoInspector<'a>,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        config: &'a Config,
        fetcher: &'a dyn Fetcher,
        runner: &'a dyn CommandRunner,
        deadline: Deadline,
    ) -> Self {
        Self {
            config,
            deadline,
            releases: UpstreamReleaseResolver::new(config, fetcher),
            rhcos: UpstreamRhcosResolver::new(config, fetcher),
            live_iso: LiveIsoInspector::new(config, fetcher, runner, deadline),
        }
    }

    /// Bring every non-skipped entry up to the newest upstream artifacts
    ///
    /// # Errors
    /// Any resolution failure, and `Error::Timeout` once the run limit passes
    pub fn reconcile(&self, catalog: &VersionCatalog) -> Result<ReconcileOutcome> {
        let mut updated = catalog.clone();
        let mut changes = BTreeSet::new();
        let mut updates = Vec::new();

        for (key, entry) in catalog.iter() {
            if self.config.is_skipped(key) {
                info!("Skipping {key} listed in the skip list");
                continue;
            }
            self.deadline.check()?;
            entry.platform(key)?;

            let mut next = entry.clone();
            let mut release_notes_url = None;
            let mut changed = false;

            if let Some(release) = self.next_release(key, &next)? {
                changes.insert(release.change);
                release_notes_url = release.release_notes_url;
                next = release.entry;
                changed = true;
            }

            if let Some(rhcos) = self.next_rhcos(key, &next)? {
                changes.insert(rhcos.change);
                next = rhcos.entry;
                changed = true;
            }

            if changed {
                updated.replace(key, next);
                updates.push(EntryUpdate {
                    version_key: key.to_string(),
                    release_notes_url,
                });
            } else {
                debug!("{key} is up to date");
            }
        }

        Ok(ReconcileOutcome {
            catalog: updated,
            changes,
            updates,
            generated_at: Utc::now(),
        })
    }

    fn next_release(&self, key: &str, entry: &VersionEntry) -> Result<Option<Change>> {
        let Some(image) = entry.release_image.as_deref() else {
            return Ok(None);
        };
        let Some(node) = self
            .releases
            .latest_release(key, entry.cpu_architecture())?
        else {
            return Ok(None);
        };

        let current = entry.current_release_version();
        if current == node.version {
            return Ok(None);
        }

        let Some(release_image) = rebuild_release_image(image, current, &node.version) else {
            warn!(
                "{key}: cannot point {image} at {}, leaving the release unchanged",
                node.version
            );
            return Ok(None);
        };

        info!(
            "New latest ocp release available for {key}, {current} -> {}",
            node.version
        );
        let display_name = if !current.is_empty() && entry.display_name.contains(current) {
            entry.display_name.replace(current, &node.version)
        } else {
            node.version.clone()
        };

        Ok(Some(Change {
            change: format!("{key}: release {current} -> {}", node.version),
            release_notes_url: node.metadata_url,
            entry: VersionEntry {
                display_name,
                release_image: Some(release_image),
                release_version: Some(node.version),
                ..entry.clone()
            },
        }))
    }

    fn next_rhcos(&self, key: &str, entry: &VersionEntry) -> Result<Option<Change>> {
        let Some(image) = entry.rhcos_image.as_deref() else {
            return Ok(None);
        };
        let current = build_id_from_url(image).ok_or_else(|| {
            Error::Configuration(format!("{key}: no rhcos build in rhcos_image {image}"))
        })?;
        let Some(build) = self.rhcos.latest_rhcos(key, entry.cpu_architecture())? else {
            return Ok(None);
        };
        if build.build_id == current {
            return Ok(None);
        }

        info!(
            "New latest rhcos release available for {key}, {current} -> {}",
            build.build_id
        );
        let bucket = build.tier.bucket(key);
        let rhcos_image = rebuild_artifact_url(image, current, &build.build_id, bucket);
        let rhcos_rootfs = entry
            .rhcos_rootfs
            .as_deref()
            .map(|url| rebuild_artifact_url(url, current, &build.build_id, bucket));

        let rhcos_version = if self.config.dry_run {
            DRY_RUN_RHCOS_VERSION.to_string()
        } else {
            self.live_iso.rhcos_version(&rhcos_image)?
        };

        Ok(Some(Change {
            change: format!("{key}: rhcos {current} -> {}", build.build_id),
            release_notes_url: None,
            entry: VersionEntry {
                rhcos_image: Some(rhcos_image),
                rhcos_rootfs,
                rhcos_version: Some(rhcos_version),
                ..entry.clone()
            },
        }))
    }
}

struct Change {
    change: String,
    release_notes_url: Option<String>,
    entry: VersionEntry,
}

/// Point a release image pull spec at another version
///
/// The old version is replaced wherever it appears in the pull spec. If it
/// does not appear, a `:tag` is swapped for the new version. Digest-pinned
/// pull specs cannot be rebuilt and yield `None`.
///
/// # Examples
/// ```
/// use ocpcat::reconcile::rebuild_release_image;
/// assert_eq!(
///     rebuild_release_image("quay.io/openshift-release-dev/ocp-release:4.11.5-x86_64", "4.11.5", "4.11.7"),
///     Some("quay.io/openshift-release-dev/ocp-release:4.11.7-x86_64".to_string())
/// );
/// ```
pub fn rebuild_release_image(image: &str, old_version: &str, new_version: &str) -> Option<String> {
    if !old_version.is_empty() && image.contains(old_version) {
        return Some(image.replace(old_version, new_version));
    }
    if image.contains('@') {
        return None;
    }
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => {
            Some(format!("{repository}:{new_version}"))
        }
        _ => None,
    }
}
