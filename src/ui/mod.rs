//! CLI output utilities: colored status lines and pipeline progress.

use std::io::IsTerminal;
use std::time::Duration;

use owo_colors::OwoColorize;

use crate::models::{PipelineResult, Stage};
use crate::pipeline::ProgressObserver;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Print a styled success line.
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print a styled error line.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a styled warning line.
pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print a styled info line.
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".cyan().bold(), msg);
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Retrieving => "Retrieving literature",
        Stage::Deduplicating => "Removing duplicates",
        Stage::Enriching => "Fetching full texts",
        Stage::Analyzing => "Running AI analysis",
        Stage::Compiling => "Compiling report",
        Stage::Done => "Done",
    }
}

/// Spinner tracking pipeline stage transitions.
pub struct StageProgress {
    spinner: indicatif::ProgressBar,
}

impl std::fmt::Debug for StageProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageProgress").finish()
    }
}

impl StageProgress {
    pub fn new() -> Self {
        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self { spinner }
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for StageProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for StageProgress {
    fn stage_changed(&self, stage: Stage) {
        if stage == Stage::Done {
            self.spinner.finish_and_clear();
            return;
        }
        self.spinner.set_message(stage_label(stage).to_string());
    }

    fn note(&self, message: &str) {
        self.spinner.println(format!("  {}", message.dimmed()));
    }
}

/// Print the end-of-run summary.
pub fn print_run_summary(result: &PipelineResult, elapsed: Duration) {
    print_section("Run Summary");
    println!("  Topic:     {}", result.topic.bold());
    println!(
        "  Items:     {} retrieved, {} after dedup, {} analyzed",
        result.counts.retrieved.to_string().cyan(),
        result.counts.deduped.to_string().cyan(),
        result.counts.processed.to_string().green()
    );
    println!("  Duration:  {:.1}s", elapsed.as_secs_f64());

    if result.has_errors() {
        print_warning(&format!("{} recorded failures:", result.errors.len()));
        for err in &result.errors {
            println!(
                "    {} [{}] {}",
                err.item_id.yellow(),
                err.stage,
                err.cause.dimmed()
            );
        }
    } else {
        print_success("No failures recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels_cover_all_stages() {
        for stage in [
            Stage::Retrieving,
            Stage::Deduplicating,
            Stage::Enriching,
            Stage::Analyzing,
            Stage::Compiling,
            Stage::Done,
        ] {
            assert!(!stage_label(stage).is_empty());
        }
    }

    #[test]
    fn test_stage_progress_observer() {
        let progress = StageProgress::new();
        progress.stage_changed(Stage::Retrieving);
        progress.stage_changed(Stage::Done);
    }
}
