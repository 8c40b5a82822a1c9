// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! CPU architecture naming and upstream URL building
//!
//! The update graph and the RHCOS mirror disagree on architecture names
//! ("amd64" vs "x86_64", "arm64" vs "aarch64"), so each platform carries both.

/// Base URL of the OpenShift mirror hosting RHCOS builds
pub const MIRROR_BASE: &str = "https://mirror.openshift.com/pub/openshift-v4";

/// Base URL of the update graph (Cincinnati) service
pub const GRAPH_BASE: &str = "https://api.openshift.com/api/upgrades_info/v1/graph";

/// Mirror bucket shared by RHCOS builds of minors that have no directory yet
pub const PRE_RELEASE_BUCKET: &str = "pre-release";

/// Architecture assumed for catalog entries that do not name one
pub const DEFAULT_CPU_ARCHITECTURE: &str = "x86_64";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Catalog name of the architecture (e.g. "x86_64")
    pub name: &'static str,
    /// Architecture parameter understood by the update graph
    pub graph_arch: &'static str,
    /// Directory name used by the mirror
    pub mirror_arch: &'static str,
}

impl Platform {
    pub const X86_64: Platform = Platform {
        name: "x86_64",
        graph_arch: "amd64",
        mirror_arch: "x86_64",
    };

    pub const AARCH64: Platform = Platform {
        name: "aarch64",
        graph_arch: "arm64",
        mirror_arch: "aarch64",
    };

    pub const PPC64LE: Platform = Platform {
        name: "ppc64le",
        graph_arch: "ppc64le",
        mirror_arch: "ppc64le",
    };

    pub const S390X: Platform = Platform {
        name: "s390x",
        graph_arch: "s390x",
        mirror_arch: "s390x",
    };

    /// Look up a platform by any of its accepted names
    ///
    /// Returns `None` for architectures the catalog does not support.
    pub fn from_cpu_architecture(arch: &str) -> Option<Platform> {
        match arch.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" => Some(Self::X86_64),
            "aarch64" | "arm64" => Some(Self::AARCH64),
            "ppc64le" => Some(Self::PPC64LE),
            "s390x" => Some(Self::S390X),
            _ => None,
        }
    }

    /// Build the update graph query for a channel
    ///
    /// # Arguments
    /// * `graph_base` - Base URL of the graph endpoint
    /// * `channel` - Channel name (e.g. "stable-4.12")
    pub fn build_graph_url(&self, graph_base: &str, channel: &str) -> String {
        format!(
            "{}?channel={}&arch={}",
            graph_base.trim_end_matches('/'),
            channel,
            self.graph_arch
        )
    }

    /// Build the URL of the RHCOS directory listing for a mirror bucket
    ///
    /// # Arguments
    /// * `mirror_base` - Base URL of the mirror
    /// * `bucket` - Minor version (e.g. "4.12") or the pre-release bucket
    pub fn build_rhcos_listing_url(&self, mirror_base: &str, bucket: &str) -> String {
        format!(
            "{}/{}/dependencies/rhcos/{}/",
            mirror_base.trim_end_matches('/'),
            self.mirror_arch,
            bucket
        )
    }
}
