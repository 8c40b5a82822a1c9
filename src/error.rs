// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Error taxonomy shared by every component
//!
//! Resolution that finds nothing new is not an error; resolvers return
//! `Ok(None)` for that case.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A single failed attempt of an external call that may succeed if retried
    #[error("transient failure for {target}: {message}")]
    Transient { target: String, message: String },

    /// An external call that kept failing after every permitted attempt
    #[error("could not resolve {target} after {attempts} attempt(s): {message}")]
    Resolution {
        target: String,
        attempts: u32,
        message: String,
    },

    /// Malformed credentials, flags, or catalog contents
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A catalog document that is not valid JSON for the catalog schema
    #[error("malformed catalog {origin}: {source}")]
    MalformedCatalog {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A catalog entry that disagrees with the artifact it references
    #[error("verification failed for {key}: {message}")]
    Verification { key: String, message: String },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("run exceeded its time limit after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is worth retrying under the default retry policy
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::MalformedCatalog { .. })
    }

    pub(crate) fn http(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Http {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
