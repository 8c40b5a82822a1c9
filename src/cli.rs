// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
// CLI argument definitions for ocpcat
//
// Separated from main.rs so that build.rs can include this file
// to generate the man page via clap_mangen.

use clap::Parser;

/// What to do with the catalog
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Update,
    Check,
}

/// CLI argument parser - bools required for clap flag parsing
#[derive(Parser)]
#[command(
    name = "ocpcat",
    version,
    about = "OpenShift release catalog reconciler",
    disable_version_flag = true
)]
#[command(arg(clap::Arg::new("version").long("version").action(clap::ArgAction::Version).help("Print version")))]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Catalog document (local path or http(s) URL)
    #[arg(value_name = "CATALOG")]
    pub catalog: Option<String>,

    /// Update the catalog to the latest upstream releases and RHCOS builds
    #[arg(short = 'u', long = "update", conflicts_with = "check")]
    pub update: bool,

    /// Verify that every catalog key matches the release image it references
    #[arg(short = 'c', long = "check", conflicts_with = "update")]
    pub check: bool,

    /// Resolve and report changes without writing files or opening a pull request
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Where to write the updated catalog (defaults to CATALOG when it is a local file)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<String>,

    /// Version key to leave alone (repeatable)
    #[arg(short = 's', long = "skip", value_name = "VERSION")]
    pub skip: Vec<String>,

    /// Allow RHCOS release candidates to be promoted into the catalog
    #[arg(long = "pre-release")]
    pub pre_release: bool,

    /// Update graph endpoint
    #[arg(long = "graph-url", value_name = "URL")]
    pub graph_url: Option<String>,

    /// Mirror hosting RHCOS builds
    #[arg(long = "mirror-url", value_name = "URL")]
    pub mirror_url: Option<String>,

    /// Path to the oc binary
    #[arg(long = "oc", value_name = "PATH")]
    pub oc: Option<String>,

    /// Environment variable holding the registry pull secret
    #[arg(long = "pull-secret-env", value_name = "NAME")]
    pub pull_secret_env: Option<String>,

    /// Abort the run after this many seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Program run with the pull request title and body after an update
    #[arg(long = "pr-hook", value_name = "PROGRAM")]
    pub pr_hook: Option<String>,

    /// Allow insecure TLS connections (skip certificate verification)
    #[arg(short = 'k', long = "insecure")]
    pub insecure: bool,

    /// Make the operation more talkative
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate shell completion script (only bash is supported currently)
    #[arg(long = "completion", value_name = "SHELL", value_parser = parse_completion_shell)]
    pub completion: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        match (self.update, self.check) {
            (true, _) => Some(Action::Update),
            (_, true) => Some(Action::Check),
            _ => None,
        }
    }
}

fn parse_completion_shell(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        "bash" => Ok(s.to_lowercase()),
        _ => Err(format!("unsupported shell: {s} (only 'bash' is supported)")),
    }
}
