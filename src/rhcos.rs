// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! RHCOS build discovery on the OpenShift mirror
//!
//! Builds are published as directories under
//! `<mirror>/<arch>/dependencies/rhcos/<minor>/`. Minors that are still in
//! development have no directory of their own yet; their builds live in the
//! shared `pre-release` bucket next to those of other minors.

use std::io::ErrorKind;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{Config, Deadline};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, display_command};
use crate::http::Fetcher;
use crate::platform::{PRE_RELEASE_BUCKET, Platform};
use crate::version::{is_pre_release, latest, matches_minor};

/// Kernel argument in the live ISO's ZIPL.PRM that carries the RHCOS version
const LIVE_ISO_VERSION_MARKER: &str = "coreos.liveiso=rhcos-";

/// Where on the mirror a build was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhcosTier {
    /// The minor's own directory
    Minor,
    /// The shared pre-release bucket
    PreRelease,
}

impl RhcosTier {
    /// Mirror directory holding builds of this tier
    #[must_use]
    pub fn bucket<'a>(&self, minor_key: &'a str) -> &'a str {
        match self {
            Self::Minor => minor_key,
            Self::PreRelease => PRE_RELEASE_BUCKET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhcosBuild {
    pub build_id: String,
    pub tier: RhcosTier,
}

/// Scrapes mirror listings for the newest RHCOS build of a minor version
pub struct UpstreamRhcosResolver<'a> {
    fetcher: &'a dyn Fetcher,
    mirror_url: String,
    include_pre_release: bool,
}

impl<'a> UpstreamRhcosResolver<'a> {
    pub fn new(config: &Config, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            mirror_url: config.mirror_url.clone(),
            include_pre_release: config.include_pre_release,
        }
    }

    /// Find the newest RHCOS build for `minor_key`
    ///
    /// Stable builds are always preferred; fc/rc builds are only returned
    /// when pre-release promotion is enabled. Returns `Ok(None)` when no
    /// eligible build exists.
    pub fn latest_rhcos(
        &self,
        minor_key: &str,
        cpu_architecture: &str,
    ) -> Result<Option<RhcosBuild>> {
        let platform = Platform::from_cpu_architecture(cpu_architecture).ok_or_else(|| {
            Error::Configuration(format!("unsupported cpu architecture '{cpu_architecture}'"))
        })?;

        let (names, tier) = match self.list_builds(&platform, minor_key)? {
            Some(names) => (names, RhcosTier::Minor),
            None => {
                debug!("no rhcos directory for {minor_key}, falling back to {PRE_RELEASE_BUCKET}");
                match self.list_builds(&platform, PRE_RELEASE_BUCKET)? {
                    Some(names) => (names, RhcosTier::PreRelease),
                    None => {
                        info!("No rhcos builds found for {minor_key} ({})", platform.name);
                        return Ok(None);
                    }
                }
            }
        };

        Ok(select_build(&names, minor_key, self.include_pre_release).map(|build_id| {
            RhcosBuild {
                build_id: build_id.to_string(),
                tier,
            }
        }))
    }

    /// Directory names in a bucket, `None` if the bucket is missing or empty
    fn list_builds(&self, platform: &Platform, bucket: &str) -> Result<Option<Vec<String>>> {
        let url = platform.build_rhcos_listing_url(&self.mirror_url, bucket);
        let Some(body) = self.fetcher.get_text(&url)? else {
            return Ok(None);
        };
        let names = parse_listing(&body);
        Ok((!names.is_empty()).then_some(names))
    }
}

/// Pick the newest eligible build of a minor from a listing
///
/// # Arguments
/// * `names` - Directory names from a mirror listing
/// * `minor_key` - Minor version the build must belong to
/// * `include_pre_release` - Whether fc/rc builds may be chosen when no stable
///   build exists
pub fn select_build<'a>(
    names: &'a [String],
    minor_key: &str,
    include_pre_release: bool,
) -> Option<&'a str> {
    let (pre_release, stable): (Vec<&str>, Vec<&str>) = names
        .iter()
        .map(String::as_str)
        .filter(|name| matches_minor(name, minor_key))
        .partition(|name| is_pre_release(name));

    latest(stable).or_else(|| {
        if include_pre_release {
            latest(pre_release)
        } else {
            None
        }
    })
}

/// Extract directory names from an HTML directory listing
///
/// Parent links, absolute links and sort-order query links are dropped.
pub fn parse_listing(html: &str) -> Vec<String> {
    let mut names = vec![];
    for chunk in html.split("href=").skip(1) {
        let Some(quote) = chunk.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let Some(value) = chunk[1..].split(quote).next() else {
            continue;
        };

        let name = value.trim_start_matches("./").trim_end_matches('/');
        if name.is_empty()
            || name.starts_with("..")
            || name.starts_with('?')
            || name.starts_with('/')
            || name.contains("://")
        {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

/// Build identifier of an RHCOS artifact URL: the directory holding the file
///
/// # Examples
/// ```
/// use ocpcat::rhcos::build_id_from_url;
/// let url = "https://mirror.openshift.com/pub/openshift-v4/x86_64/dependencies/rhcos/4.12/4.12.3/rhcos-4.12.3-x86_64-live.x86_64.iso";
/// assert_eq!(build_id_from_url(url), Some("4.12.3"));
/// ```
pub fn build_id_from_url(url: &str) -> Option<&str> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    segments.next()?;
    segments.next().filter(|segment| !segment.is_empty())
}

/// Point an RHCOS artifact URL at another build
///
/// Every occurrence of `old_build` (directory and file name) becomes
/// `new_build`, and the directory above the build is set to `bucket` so a
/// build that moved between the pre-release bucket and its minor directory
/// resolves correctly.
pub fn rebuild_artifact_url(url: &str, old_build: &str, new_build: &str, bucket: &str) -> String {
    let replaced = url.replace(old_build, new_build);
    let mut segments: Vec<&str> = replaced.split('/').collect();
    if let Some(idx) = segments.iter().rposition(|segment| *segment == new_build)
        && idx > 0
    {
        segments[idx - 1] = bucket;
    }
    segments.join("/")
}

/// Reads the RHCOS version stamped into a live ISO
///
/// The ISO is downloaded to a temp file and its ZIPL.PRM kernel arguments
/// are read with `isoinfo`.
pub struct LiveIsoInspector<'a> {
    fetcher: &'a dyn Fetcher,
    runner: &'a dyn CommandRunner,
    isoinfo_binary: PathBuf,
    deadline: Deadline,
}

impl<'a> LiveIsoInspector<'a> {
    pub fn new(
        config: &Config,
        fetcher: &'a dyn Fetcher,
        runner: &'a dyn CommandRunner,
        deadline: Deadline,
    ) -> Self {
        Self {
            fetcher,
            runner,
            isoinfo_binary: config.isoinfo_binary.clone(),
            deadline,
        }
    }

    /// Download `iso_url` and return the RHCOS version it declares
    pub fn rhcos_version(&self, iso_url: &str) -> Result<String> {
        let mut iso = NamedTempFile::new()?;
        let size = self.fetcher.download(iso_url, iso.as_file_mut())?;
        debug!("downloaded {size} bytes from {iso_url}");

        let args = vec![
            "-i".to_string(),
            iso.path().display().to_string(),
            "-x".to_string(),
            "/ZIPL.PRM;1".to_string(),
        ];
        let command = display_command(&self.isoinfo_binary, &args);
        self.deadline.check()?;
        let output = self
            .runner
            .run(&self.isoinfo_binary, &args, self.deadline.remaining())
            .map_err(|e| match e.kind() {
                ErrorKind::TimedOut => self.deadline.expired(),
                _ => Error::Configuration(format!("cannot run '{command}': {e}")),
            })?;
        if !output.success() {
            return Err(Error::Resolution {
                target: iso_url.to_string(),
                attempts: 1,
                message: format!("'{command}' failed: {}", output.stderr.trim()),
            });
        }

        let version = parse_live_iso_version(&output.stdout).ok_or_else(|| Error::Resolution {
            target: iso_url.to_string(),
            attempts: 1,
            message: format!("no {LIVE_ISO_VERSION_MARKER} argument in ZIPL.PRM"),
        })?;
        info!("Found rhcos version {version} in {iso_url}");
        Ok(version)
    }
}

/// Pull the RHCOS version out of ZIPL.PRM contents
pub fn parse_live_iso_version(zipl_prm: &str) -> Option<String> {
    let (_, rest) = zipl_prm.split_once(LIVE_ISO_VERSION_MARKER)?;
    rest.split_whitespace().next().map(ToString::to_string)
}
