// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! OpenShift release catalog reconciler (ocpcat) - Main Application
//!
//! This is the entry point for the ocpcat CLI tool, which keeps the catalog
//! of default OpenShift release images and RHCOS artifacts current.
//!
//! The application supports:
//! - Updating the catalog to the latest upstream releases and RHCOS builds
//! - Verifying that every catalog key matches its release image
//! - Dry runs that report changes without writing anything
//! - Handing the resulting change to a pull request hook

use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ocpcat::catalog::is_remote;
use ocpcat::config::{DEFAULT_PULL_SECRET_ENV, registry_credentials_from_env};
use ocpcat::exec::SystemRunner;
use ocpcat::http::HttpClient;
use ocpcat::publish::{HookSink, LogSink, PullRequestSink};
use ocpcat::{
    CatalogUpdater, Config, Error, ReconcileOutcome, ReconciliationEngine, ReleaseInfoInspector,
    Result, UpdateStatus, VerificationEngine, VersionCatalog,
};

mod cli;

use cli::{Action, Cli};

/// Main application entry point
///
/// Parses command line arguments, sets up logging and dispatches to the
/// requested action. Any error is printed to stderr and turns into exit code 1.
fn main() {
    let cli = Cli::parse();

    // Handle completion generation first (exits immediately)
    if cli.completion.is_some() {
        print_bash_completion();
        return;
    }

    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("ocpcat: {e}");
        exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("ocpcat=debug,warn")
        } else {
            EnvFilter::new("ocpcat=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let Some(source) = cli.catalog.as_deref() else {
        return Err(Error::Configuration(
            "missing catalog\nTry 'ocpcat --help' for more information.".to_string(),
        ));
    };
    let Some(action) = cli.action() else {
        return Err(Error::Configuration(
            "missing action, use --update or --check\nTry 'ocpcat --help' for more information."
                .to_string(),
        ));
    };

    let config = build_config(cli);
    // One budget for the whole run, shared by every component below
    let deadline = config.deadline();
    let http = HttpClient::new(config.http_timeout, config.insecure).with_deadline(deadline);
    let runner = SystemRunner;

    let catalog = VersionCatalog::load(source, &http)?;
    info!("Loaded {} catalog entries from {source}", catalog.len());

    let inspector = ReleaseInfoInspector::new(&config, &runner, deadline);
    let verifier = VerificationEngine::new(&config, &inspector);

    match action {
        Action::Check => verifier.verify(&catalog),
        Action::Update => {
            let output = output_path(cli, source, config.dry_run)?;
            let reconciler = ReconciliationEngine::new(&config, &http, &runner, deadline);
            let sink: Box<dyn PullRequestSink + '_> = match &cli.pr_hook {
                Some(hook) => Box::new(HookSink::new(PathBuf::from(hook), &runner, deadline)),
                None => Box::new(LogSink),
            };
            let updater = CatalogUpdater::new(&config, &reconciler, &verifier, sink.as_ref());
            cmd_update(&updater, &catalog, output.as_deref())
        }
    }
}

/// Assemble the run configuration from flags and the environment
fn build_config(cli: &Cli) -> Config {
    let defaults = Config::default();
    let pull_secret_env = cli
        .pull_secret_env
        .as_deref()
        .unwrap_or(DEFAULT_PULL_SECRET_ENV);

    Config {
        graph_url: cli.graph_url.clone().unwrap_or(defaults.graph_url),
        mirror_url: cli.mirror_url.clone().unwrap_or(defaults.mirror_url),
        skip_versions: cli.skip.clone(),
        include_pre_release: cli.pre_release,
        dry_run: cli.dry_run,
        insecure: cli.insecure,
        oc_binary: cli.oc.as_ref().map_or(defaults.oc_binary, PathBuf::from),
        registry_credentials: registry_credentials_from_env(pull_secret_env),
        run_timeout: cli.timeout.map(Duration::from_secs),
        ..defaults
    }
}

/// Where an update is written: `--output`, else the catalog itself when local
fn output_path(cli: &Cli, source: &str, dry_run: bool) -> Result<Option<PathBuf>> {
    match (&cli.output, is_remote(source)) {
        (Some(path), _) => Ok(Some(PathBuf::from(path))),
        (None, false) => Ok(Some(PathBuf::from(source))),
        (None, true) if dry_run => Ok(None),
        (None, true) => Err(Error::Configuration(format!(
            "--output is required to update the remote catalog {source}"
        ))),
    }
}

// =============================================================================
// Command Implementation Functions
// =============================================================================

/// Run the update flow and report what happened on stdout
fn cmd_update(
    updater: &CatalogUpdater<'_>,
    catalog: &VersionCatalog,
    output: Option<&Path>,
) -> Result<()> {
    match updater.update(catalog, output)? {
        UpdateStatus::UpToDate => println!("Catalog is up to date"),
        UpdateStatus::Previewed { outcome, request } => {
            print_changes(&outcome);
            info!(
                "Reconciled {} entries at {}",
                outcome.updates.len(),
                outcome.generated_at.to_rfc3339()
            );
            println!("Pull request title: {}", request.title);
            println!("Pull request body:\n{}", request.body);
        }
        UpdateStatus::Published { outcome, .. } => print_changes(&outcome),
    }
    Ok(())
}

fn print_changes(outcome: &ReconcileOutcome) {
    for change in &outcome.changes {
        println!("{change}");
    }
}

/// Print bash completion script
fn print_bash_completion() {
    print!(
        r#"# bash completion for ocpcat

_ocpcat_completions() {{
    local cur prev
    COMPREPLY=()
    cur="${{COMP_WORDS[COMP_CWORD]}}"
    prev="${{COMP_WORDS[COMP_CWORD-1]}}"

    if [[ "${{cur}}" == -* ]]; then
        local options=(
            "--check            (Verify catalog keys against release images)"
            "-c                 (Verify catalog keys against release images)"
            "--completion       (Generate shell completion script)"
            "--dry-run          (Report changes without writing anything)"
            "-n                 (Report changes without writing anything)"
            "--graph-url        (Update graph endpoint)"
            "-h                 (Print help)"
            "--help             (Print help)"
            "--insecure         (Skip TLS certificate verification)"
            "-k                 (Skip TLS certificate verification)"
            "--mirror-url       (Mirror hosting RHCOS builds)"
            "--oc               (Path to the oc binary)"
            "--output           (Where to write the updated catalog)"
            "-o                 (Where to write the updated catalog)"
            "--pr-hook          (Program that opens the pull request)"
            "--pre-release      (Allow RHCOS release candidates)"
            "--pull-secret-env  (Variable holding the pull secret)"
            "--skip             (Version key to leave alone)"
            "-s                 (Version key to leave alone)"
            "--timeout          (Abort the run after SECONDS)"
            "--update           (Update the catalog to the latest releases)"
            "-u                 (Update the catalog to the latest releases)"
            "-v                 (Make the operation more talkative)"
            "--verbose          (Make the operation more talkative)"
            "--version          (Print version)"
        )

        local IFS=$'\n'
        local opt name padded
        local width=$((COLUMNS - 1))
        for opt in "${{options[@]}}"; do
            name="${{opt%%  *}}"
            if [[ "$name" == "${{cur}}"* ]]; then
                printf -v padded "%-${{width}}s" "$opt"
                COMPREPLY+=("$padded")
            fi
        done

        if ((${{#COMPREPLY[@]}} == 1)); then
            COMPREPLY[0]="${{COMPREPLY[0]%%  *}}"
        fi
    else
        COMPREPLY=($(compgen -f -- "${{cur}}"))
    fi
}}

complete -o nosort -F _ocpcat_completions ocpcat
"#
    );
}
