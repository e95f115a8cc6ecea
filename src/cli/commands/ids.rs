//! Ids command: build the identifier list from an appraisal roll export.

use std::path::{Path, PathBuf};

use console::style;

use crate::config::Settings;
use crate::repository::{extract_identifiers, write_identifiers};

/// Extract identifiers from `input` and write the id list.
///
/// Returns the number of identifiers written; nothing is written when no
/// row matches.
pub fn cmd_ids(
    settings: &Settings,
    input: &Path,
    column: &str,
    prefix: &str,
    output: Option<&Path>,
) -> anyhow::Result<usize> {
    let output: PathBuf = output.map(Path::to_path_buf).unwrap_or_else(|| settings.ids_path());

    let ids = extract_identifiers(input, column, prefix)?;
    if ids.is_empty() {
        println!(
            "{} No IDs starting with '{}' found in {}",
            style("!").yellow(),
            prefix,
            input.display()
        );
        return Ok(0);
    }

    write_identifiers(&output, &ids)?;
    println!(
        "{} Extracted {} IDs into {}",
        style("✓").green(),
        ids.len(),
        output.display()
    );
    Ok(ids.len())
}
