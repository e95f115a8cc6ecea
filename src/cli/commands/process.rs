//! Process command: reshape raw results into the analytic table.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::services::{process_results, ProcessSummary};

/// Process the results file. A missing or empty input is reported and
/// returns `None`.
pub fn cmd_process(
    settings: &Settings,
    input: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<Option<ProcessSummary>> {
    let input = input.map(Path::to_path_buf).unwrap_or_else(|| settings.results_path());
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.processed_path());

    let empty = std::fs::metadata(&input).map(|m| m.len() == 0);
    if !matches!(empty, Ok(false)) {
        println!(
            "{} No results to process at {}",
            style("!").yellow(),
            input.display()
        );
        return Ok(None);
    }

    let summary = process_results(&input, &output)?;
    println!(
        "{} Processed {} records into {}",
        style("✓").green(),
        summary.rows,
        output.display()
    );
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_results_file() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(cmd_process(&settings, None, None).unwrap().is_none());
        assert!(!settings.processed_path().exists());
    }

    #[test]
    fn test_explicit_paths() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("table.csv");
        std::fs::write(
            &input,
            "Property ID,Result\nR1,\"{\"\"error\"\":\"\"exhausted after 1 attempts, status=404\"\"}\"\n",
        )
        .unwrap();

        let summary = cmd_process(&Settings::default(), Some(&input), Some(&output))
            .unwrap()
            .unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.with_balance, 0);
        assert!(output.exists());
    }
}
