// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Blocking HTTP access to the upstream services

use std::io::Write;
use std::time::Duration;

use attohttpc::RequestBuilder;
use tracing::debug;

use crate::config::Deadline;
use crate::error::{Error, Result};

/// Minimal HTTP surface the resolvers need
pub trait Fetcher {
    /// GET a text document
    ///
    /// Returns `Ok(None)` when the server answers 404, so callers can tell a
    /// missing directory apart from a failed request.
    fn get_text(&self, url: &str) -> Result<Option<String>>;

    /// Stream a (possibly large) binary document into `dest`
    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64>;
}

/// `Fetcher` backed by attohttpc
///
/// Text documents must arrive within `timeout` as a whole. Downloads are only
/// bounded per connect and per read, so a large ISO on a slow link keeps
/// going as long as bytes keep arriving. Both are cut short by the run
/// deadline.
#[derive(Debug, Clone)]
pub struct HttpClient {
    timeout: Duration,
    insecure: bool,
    deadline: Deadline,
}

impl HttpClient {
    pub fn new(timeout: Duration, insecure: bool) -> Self {
        Self {
            timeout,
            insecure,
            deadline: Deadline::unlimited(),
        }
    }

    /// Bound every request by the budget of the surrounding run
    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    fn request(&self, url: &str) -> Result<RequestBuilder> {
        self.deadline.check()?;
        debug!("GET {url}");
        let request = attohttpc::get(url)
            .header(
                attohttpc::header::USER_AGENT,
                format!("ocpcat/{}", env!("CARGO_PKG_VERSION")),
            )
            .danger_accept_invalid_certs(self.insecure);
        Ok(request)
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<attohttpc::Response> {
        request.send().map_err(|e| self.failure(url, e))
    }

    /// A transfer error, reported as a timeout when the run budget is gone
    fn failure(&self, url: &str, e: attohttpc::Error) -> Error {
        if self.deadline.check().is_err() {
            self.deadline.expired()
        } else {
            Error::http(url, e)
        }
    }

    /// `limit`, shortened to whatever is left of the run
    fn clamp(&self, limit: Duration) -> Duration {
        self.deadline.remaining().map_or(limit, |left| left.min(limit))
    }
}

impl Fetcher for HttpClient {
    fn get_text(&self, url: &str) -> Result<Option<String>> {
        let request = self.request(url)?.timeout(self.clamp(self.timeout));
        let resp = self.send(url, request)?;
        let status = resp.status();

        if status == attohttpc::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::http(url, format!("status {status}")));
        }

        resp.text().map(Some).map_err(|e| Error::http(url, e))
    }

    fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
        let mut request = self
            .request(url)?
            .connect_timeout(self.clamp(self.timeout))
            .read_timeout(self.clamp(self.timeout));
        if let Some(left) = self.deadline.remaining() {
            request = request.timeout(left);
        }

        let resp = self.send(url, request)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::http(url, format!("status {status}")));
        }

        resp.write_to(dest).map_err(|e| self.failure(url, e))
    }
}
