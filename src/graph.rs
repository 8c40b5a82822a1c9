// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Latest OpenShift release lookup through the update graph
//!
//! The graph service publishes every release reachable through a channel.
//! A minor that has not reached the stable channel yet is looked up in the
//! candidate channel instead.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::platform::Platform;
use crate::version::{compare_versions, matches_minor};

pub const STABLE_CHANNEL: &str = "stable";
pub const CANDIDATE_CHANNEL: &str = "candidate";

/// A release published by the update graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNode {
    pub version: String,
    /// Release notes / errata link, when the graph provides one
    pub metadata_url: Option<String>,
}

#[derive(Deserialize)]
struct GraphResponse {
    #[serde(default)]
    nodes: Vec<GraphNode>,
}

#[derive(Deserialize)]
struct GraphNode {
    version: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Queries the update graph for the newest release of a minor version
pub struct UpstreamReleaseResolver<'a> {
    fetcher: &'a dyn Fetcher,
    graph_url: String,
}

impl<'a> UpstreamReleaseResolver<'a> {
    pub fn new(config: &Config, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            graph_url: config.graph_url.clone(),
        }
    }

    /// Find the newest release of `minor_key` for an architecture
    ///
    /// Returns `Ok(None)` when neither the stable nor the candidate channel
    /// has anything for this minor yet.
    ///
    /// # Errors
    /// Failed requests (other than 404), malformed responses, and unknown
    /// architectures
    pub fn latest_release(
        &self,
        minor_key: &str,
        cpu_architecture: &str,
    ) -> Result<Option<ReleaseNode>> {
        let platform = Platform::from_cpu_architecture(cpu_architecture).ok_or_else(|| {
            Error::Configuration(format!("unsupported cpu architecture '{cpu_architecture}'"))
        })?;

        if let Some(node) = self.latest_in_channel(STABLE_CHANNEL, minor_key, &platform)? {
            return Ok(Some(node));
        }

        debug!("no stable release for {minor_key}, trying the {CANDIDATE_CHANNEL} channel");
        let candidate = self.latest_in_channel(CANDIDATE_CHANNEL, minor_key, &platform)?;
        if candidate.is_none() {
            info!("No release found for {minor_key} ({})", platform.name);
        }
        Ok(candidate)
    }

    fn latest_in_channel(
        &self,
        channel: &str,
        minor_key: &str,
        platform: &Platform,
    ) -> Result<Option<ReleaseNode>> {
        let url = platform.build_graph_url(&self.graph_url, &format!("{channel}-{minor_key}"));
        let Some(body) = self.fetcher.get_text(&url)? else {
            return Ok(None);
        };
        let graph: GraphResponse =
            serde_json::from_str(&body).map_err(|e| Error::http(&url, e))?;

        let latest = graph
            .nodes
            .into_iter()
            .filter(|node| matches_minor(&node.version, minor_key))
            .max_by(|a, b| compare_versions(&a.version, &b.version))
            .map(|mut node| ReleaseNode {
                metadata_url: node.metadata.remove("url"),
                version: node.version,
            });
        Ok(latest)
    }
}
