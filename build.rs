// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)

use std::fs;
use std::path::Path;

use clap::CommandFactory;

include!("src/cli.rs");

const MAN_PAGE: &str = "ocpcat.1";

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let mut page: Vec<u8> = Vec::new();
    clap_mangen::Man::new(Cli::command())
        .render(&mut page)
        .expect("failed to render man page");

    // Kept in the source tree so the page ships with the repository. A
    // read-only checkout still builds, it just keeps the committed page.
    let man_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("man");
    let written =
        fs::create_dir_all(&man_dir).and_then(|()| fs::write(man_dir.join(MAN_PAGE), &page));
    if let Err(e) = written {
        println!(
            "cargo::warning=could not write {}: {e}",
            man_dir.join(MAN_PAGE).display()
        );
    }
}
