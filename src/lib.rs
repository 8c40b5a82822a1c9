// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! OpenShift release catalog reconciliation library
//!
//! This library maintains the catalog that maps each supported OpenShift
//! minor version to its release image and RHCOS live ISO / rootfs artifacts.
//! It discovers the newest upstream release and RHCOS build per minor,
//! computes the minimal catalog update, and verifies that every catalog key
//! agrees with the artifacts it points to.

pub mod catalog;
pub mod config;
pub mod error;
pub mod exec;
pub mod graph;
pub mod http;
pub mod platform;
pub mod publish;
pub mod reconcile;
pub mod release_info;
pub mod rhcos;
pub mod update;
pub mod verify;
pub mod version;

// Re-export commonly used items at the crate root for convenience
pub use catalog::{VersionCatalog, VersionEntry};
pub use config::Config;
pub use error::{Error, Result};
pub use platform::Platform;
pub use reconcile::{ReconcileOutcome, ReconciliationEngine};
pub use release_info::{ReleaseInfoInspector, RetryPolicy};
pub use update::{CatalogUpdater, UpdateStatus};
pub use verify::VerificationEngine;
pub use version::{compare_versions, extract_major_minor, is_pre_release};
