//! Run command: id extraction, scrape and processing in sequence.

use std::path::Path;
use std::time::Instant;

use console::style;

use super::ids::cmd_ids;
use super::process::cmd_process;
use super::scrape::{cmd_scrape, ScrapeArgs};
use crate::config::Settings;
use crate::services::ProcessSummary;
use crate::utils::{format_currency, format_duration};

/// Id list source for the first step.
pub struct RollExport<'a> {
    pub path: &'a Path,
    pub column: &'a str,
    pub prefix: &'a str,
}

/// Run the full pipeline, stopping with a message at the first step that
/// produces nothing.
pub async fn cmd_run(
    settings: &Settings,
    roll: Option<RollExport<'_>>,
    show_progress: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    println!("{}", style("=== Starting tax data collection ===").bold());

    if let Some(roll) = roll {
        println!("\n{} Step 1: Extracting property IDs", style("→").cyan());
        if cmd_ids(settings, roll.path, roll.column, roll.prefix, None)? == 0 {
            println!("{} No IDs extracted. Stopping.", style("!").yellow());
            return Ok(());
        }
    } else {
        println!(
            "\n{} Step 1: Using ID list {}",
            style("→").cyan(),
            settings.ids_path().display()
        );
    }

    println!("\n{} Step 2: Scraping tax data", style("→").cyan());
    let args = ScrapeArgs {
        no_progress: !show_progress,
        ..Default::default()
    };
    let scraped = cmd_scrape(settings, &args).await?;
    if scraped.is_empty() {
        println!("{} Nothing was scraped. Stopping.", style("!").yellow());
        return Ok(());
    }

    println!("\n{} Step 3: Processing results", style("→").cyan());
    let summary = match cmd_process(settings, None, None)? {
        Some(summary) if summary.rows > 0 => summary,
        _ => {
            println!("{} No records were processed.", style("!").yellow());
            return Ok(());
        }
    };

    println!();
    for line in summary_lines(&summary, start.elapsed()) {
        println!("{}", line);
    }
    Ok(())
}

fn summary_lines(summary: &ProcessSummary, elapsed: std::time::Duration) -> Vec<String> {
    let per_record = elapsed.div_f64(summary.rows.max(1) as f64);
    let mean = summary
        .mean_balance
        .map(format_currency)
        .unwrap_or_else(|| "n/a".to_string());

    vec![
        format!("{} Process complete", style("✓").green()),
        format!("  Total time: {}", format_duration(elapsed)),
        format!("  Records processed: {}", summary.rows),
        format!("  Average time per record: {}", format_duration(per_record)),
        format!("  Properties with payments: {}", summary.with_payment),
        format!("  Properties with outstanding balance: {}", summary.with_balance),
        format!("  Average outstanding balance: {}", mean),
    ]
}
