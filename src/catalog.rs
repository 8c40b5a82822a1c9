// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! The version catalog: minor version key -> installation artifacts
//!
//! The catalog is a JSON object whose keys are "major.minor" strings. Entry
//! order follows the source document and is preserved when the catalog is
//! written back, so an update only touches the entries that changed.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::platform::{DEFAULT_CPU_ARCHITECTURE, Platform};
use crate::rhcos::build_id_from_url;
use crate::version::is_minor_key;

/// Installation artifacts for one OpenShift minor version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionEntry {
    /// Human-readable release label
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_architecture: Option<String>,
    /// Pull spec of the OCP release image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_image: Option<String>,
    /// Exact version embedded in the release image's metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
    /// RHCOS live ISO URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhcos_image: Option<String>,
    /// RHCOS root filesystem URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhcos_rootfs: Option<String>,
    /// RHCOS build identifier read from the live ISO
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhcos_version: Option<String>,
}

impl VersionEntry {
    /// The version the entry currently declares for its release image
    #[must_use]
    pub fn current_release_version(&self) -> &str {
        self.release_version.as_deref().unwrap_or(&self.display_name)
    }

    /// Build identifier embedded in the live ISO URL
    #[must_use]
    pub fn rhcos_build_id(&self) -> Option<&str> {
        self.rhcos_image.as_deref().and_then(build_id_from_url)
    }

    /// The entry's architecture name, defaulting to x86_64
    #[must_use]
    pub fn cpu_architecture(&self) -> &str {
        self.cpu_architecture
            .as_deref()
            .unwrap_or(DEFAULT_CPU_ARCHITECTURE)
    }

    /// Resolve the entry's architecture
    ///
    /// # Errors
    /// `Error::Configuration` for an architecture the catalog does not support
    pub fn platform(&self, version_key: &str) -> Result<Platform> {
        let arch = self.cpu_architecture();
        Platform::from_cpu_architecture(arch).ok_or_else(|| {
            Error::Configuration(format!(
                "{version_key}: unsupported cpu architecture '{arch}'"
            ))
        })
    }
}

/// Ordered mapping from version key to `VersionEntry`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCatalog {
    entries: Vec<(String, VersionEntry)>,
}

impl VersionCatalog {
    /// Build a catalog from entries in order
    ///
    /// # Errors
    /// `Error::Configuration` for malformed or duplicated keys
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, VersionEntry)>,
    {
        let mut catalog = Self::default();
        for (key, entry) in entries {
            check_key(&catalog.entries, &key).map_err(Error::Configuration)?;
            catalog.entries.push((key, entry));
        }
        Ok(catalog)
    }

    /// Parse a catalog document
    ///
    /// # Arguments
    /// * `json` - Document text
    /// * `origin` - Path or URL the text came from, for error messages
    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::MalformedCatalog {
            origin: origin.to_string(),
            source,
        })
    }

    /// Render the whole document as pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json =
            serde_json::to_string_pretty(self).map_err(|source| Error::MalformedCatalog {
                origin: "<serialized catalog>".to_string(),
                source,
            })?;
        json.push('\n');
        Ok(json)
    }

    /// Load a catalog from a local path or an http(s) URL
    pub fn load(source: &str, fetcher: &dyn Fetcher) -> Result<Self> {
        let text = if is_remote(source) {
            debug!("loading catalog from {source}");
            fetcher
                .get_text(source)?
                .ok_or_else(|| Error::Configuration(format!("catalog not found at {source}")))?
        } else {
            debug!("loading catalog from file {source}");
            fs::read_to_string(source)?
        };
        Self::from_json(&text, source)
    }

    /// Write the whole document to `path`
    ///
    /// The document is written to a sibling temp file first and renamed into
    /// place, so readers never observe a partial catalog.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, version_key: &str) -> Option<&VersionEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == version_key)
            .map(|(_, entry)| entry)
    }

    /// Swap in a new entry for an existing key, keeping its position
    ///
    /// Returns the previous entry, or `None` if the key is not in the catalog.
    pub fn replace(&mut self, version_key: &str, entry: VersionEntry) -> Option<VersionEntry> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == version_key)
            .map(|(_, slot)| std::mem::replace(slot, entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a catalog source names a remote document
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn check_key(existing: &[(String, VersionEntry)], key: &str) -> std::result::Result<(), String> {
    if !is_minor_key(key) {
        return Err(format!("invalid version key '{key}', expected major.minor"));
    }
    if existing.iter().any(|(k, _)| k == key) {
        return Err(format!("duplicate version key '{key}'"));
    }
    Ok(())
}

impl Serialize for VersionCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VersionCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = VersionCatalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from version key to catalog entry")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, entry)) = map.next_entry::<String, VersionEntry>()? {
                    check_key(&entries, &key).map_err(de::Error::custom)?;
                    entries.push((key, entry));
                }
                Ok(VersionCatalog { entries })
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}
