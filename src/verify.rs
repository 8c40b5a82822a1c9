// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Catalog consistency checks
//!
//! Verification stops at the first inconsistent entry: shipping a catalog
//! whose keys disagree with their artifacts is worse than failing the build.

use tracing::{debug, info};

use crate::catalog::{VersionCatalog, VersionEntry};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::release_info::ReleaseInfoInspector;
use crate::rhcos::build_id_from_url;
use crate::version::extract_major_minor;

pub struct VerificationEngine<'a> {
    config: &'a Config,
    inspector: &'a ReleaseInfoInspector<'a>,
}

impl<'a> VerificationEngine<'a> {
    pub fn new(config: &'a Config, inspector: &'a ReleaseInfoInspector<'a>) -> Self {
        Self { config, inspector }
    }

    /// Check every non-skipped entry against the artifacts it references
    ///
    /// # Errors
    /// `Error::Verification` for the first inconsistent entry; inspection
    /// failures and timeouts are passed through.
    pub fn verify(&self, catalog: &VersionCatalog) -> Result<()> {
        let deadline = self.inspector.deadline();

        for (key, entry) in catalog.iter() {
            if self.config.is_skipped(key) {
                info!("Skipping verification of {key} listed in the skip list");
                continue;
            }
            deadline.check()?;
            self.verify_entry(key, entry)?;
        }

        info!("Verified {} catalog entries", catalog.len());
        Ok(())
    }

    fn verify_entry(&self, key: &str, entry: &VersionEntry) -> Result<()> {
        if let Some(release_version) = entry.release_version.as_deref() {
            expect_minor(key, release_version, "release_version")?;
        }

        if let (Some(image), Some(rootfs)) =
            (entry.rhcos_image.as_deref(), entry.rhcos_rootfs.as_deref())
        {
            let image_build = build_id_from_url(image);
            let rootfs_build = build_id_from_url(rootfs);
            if image_build.is_none() || image_build != rootfs_build {
                return Err(Error::Verification {
                    key: key.to_string(),
                    message: format!(
                        "rhcos_image {image} and rhcos_rootfs {rootfs} reference different builds"
                    ),
                });
            }
        }

        let Some(release_image) = entry.release_image.as_deref() else {
            return Ok(());
        };
        let actual = self
            .inspector
            .inspect(release_image, self.config.registry_credentials.as_deref())?;
        debug!("{key}: {release_image} reports {actual}");

        match entry.release_version.as_deref() {
            Some(declared) if declared != actual => Err(Error::Verification {
                key: key.to_string(),
                message: format!(
                    "release_image {release_image} reports {actual}, catalog declares {declared}"
                ),
            }),
            Some(_) => Ok(()),
            None => expect_minor(key, &actual, &format!("release_image {release_image}")),
        }
    }
}

fn expect_minor(key: &str, version: &str, what: &str) -> Result<()> {
    if extract_major_minor(version).as_deref() == Some(key) {
        Ok(())
    } else {
        Err(Error::Verification {
            key: key.to_string(),
            message: format!("{what} has version {version}, which is not part of {key}"),
        })
    }
}
