//! Stage progress output
//!
//! Prints each pipeline stage as it starts and finishes, with timestamps and
//! durations, then a summary block once the run is over.

use chrono::Local;
use colored::Colorize;
use paystrap_core::{BootstrapError, RunReport, Stage, StageObserver};
use std::time::{Duration, Instant};

/// Outcome of one stage as shown in the summary
#[derive(Debug, Clone)]
pub enum StageResult {
    /// Completed, with an optional detail line
    Success {
        duration: Duration,
        message: Option<String>,
    },
    /// Not run (nothing to act on)
    Skipped { reason: String },
    /// Stopped the run
    Failed { error: String, duration: Duration },
}

impl StageResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Skipped { .. })
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Success { duration, .. } => Some(*duration),
            Self::Failed { duration, .. } => Some(*duration),
            Self::Skipped { .. } => None,
        }
    }

    /// Detail text for the summary line
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } => message.as_deref(),
            Self::Skipped { reason } => Some(reason.as_str()),
            Self::Failed { error, .. } => Some(error.as_str()),
        }
    }

    fn glyph(&self) -> colored::ColoredString {
        match self {
            Self::Success { .. } => "✓".green(),
            Self::Skipped { .. } => "⏭".yellow(),
            Self::Failed { .. } => "✗".red().bold(),
        }
    }
}

/// Stage logger for the terminal
pub struct StageLogger {
    start_time: Instant,
    stage_results: Vec<(Stage, StageResult)>,
    current_stage: Option<(Stage, Instant)>,
}

impl StageLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            stage_results: Vec::new(),
            current_stage: None,
        }
    }

    fn elapsed(&mut self, stage: Stage) -> Duration {
        match self.current_stage.take() {
            Some((current, start)) if current == stage => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn all_success(&self) -> bool {
        self.stage_results
            .iter()
            .all(|(_, result)| result.is_success())
    }

    pub fn print_summary(&self, report: &RunReport) {
        let total_duration = self.start_time.elapsed();

        let error_count = self
            .stage_results
            .iter()
            .filter(|(_, result)| matches!(result, StageResult::Failed { .. }))
            .count();

        let slowest_stage = self
            .stage_results
            .iter()
            .filter_map(|(stage, result)| result.duration().map(|d| (stage, d)))
            .max_by_key(|(_, d)| *d);

        let title = if self.all_success() {
            "Bootstrap Summary".green().bold()
        } else {
            "Bootstrap Summary".red().bold()
        };

        println!();
        println!("{}", "═".repeat(44));
        println!("{}", title);
        println!("{}", "─".repeat(44));
        for (stage, result) in &self.stage_results {
            match result.detail() {
                Some(detail) => println!(
                    "  {} {}: {}",
                    result.glyph(),
                    stage.label(),
                    detail.dimmed()
                ),
                None => println!("  {} {}", result.glyph(), stage.label()),
            }
        }
        println!("{}", "─".repeat(44));
        println!("Total time:    {}", format_duration(total_duration).green());

        if let Some((stage, duration)) = slowest_stage {
            println!(
                "Slowest stage: {} ({})",
                stage.label(),
                format_duration(duration)
            );
        }

        if error_count > 0 {
            println!("Errors:        {}", error_count.to_string().red().bold());
        } else {
            println!("Errors:        {}", "0".green());
        }

        if let Some(account_id) = &report.account_id {
            println!("Account:       {}", account_id.cyan());
        }
        if !report.account_status.is_empty() {
            let status = &report.account_status;
            println!("Charges:       {}", flag(status.charges_enabled));
            println!("Payouts:       {}", flag(status.payouts_enabled));
            println!("Details:       {}", flag(status.details_submitted));
        }
        if let Some(env_file) = &report.env_file {
            println!("Env file:      {}", env_file.display());
        }
        if let Some(pid) = report.relay_pid {
            println!("Relay pid:     {}", pid);
        }
        if let Some(log) = &report.relay_log {
            println!("Relay log:     {}", log.display());
        }
        if !report.capabilities.is_empty() {
            println!("Capabilities:  {}", report.capabilities.join(", "));
        }
        if let Some(interval) = report.payout_schedule {
            println!("Payout plan:   {}", interval);
        }
        println!("{}", "═".repeat(44));
    }
}

impl Default for StageLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl StageObserver for StageLogger {
    fn stage_started(&mut self, stage: Stage) {
        println!("[{}] {} {}", timestamp().dimmed(), "▶".cyan(), stage.label());
        self.current_stage = Some((stage, Instant::now()));
    }

    fn stage_succeeded(&mut self, stage: Stage, detail: Option<&str>) {
        let duration = self.elapsed(stage);
        let duration_str = format_duration(duration);

        match detail {
            Some(msg) => println!(
                "[{}] {} {}: {} ({})",
                timestamp().dimmed(),
                "✓".green().bold(),
                stage.label(),
                msg,
                duration_str.dimmed()
            ),
            None => println!(
                "[{}] {} {} ({})",
                timestamp().dimmed(),
                "✓".green().bold(),
                stage.label(),
                duration_str.dimmed()
            ),
        }

        self.stage_results.push((
            stage,
            StageResult::Success {
                duration,
                message: detail.map(String::from),
            },
        ));
    }

    fn stage_skipped(&mut self, stage: Stage, reason: &str) {
        self.current_stage = None;
        println!(
            "[{}] {} {} ({})",
            timestamp().dimmed(),
            "⏭".yellow(),
            stage.label(),
            reason.dimmed()
        );

        self.stage_results.push((
            stage,
            StageResult::Skipped {
                reason: reason.to_string(),
            },
        ));
    }

    fn stage_failed(&mut self, stage: Stage, error: &BootstrapError) {
        let duration = self.elapsed(stage);
        println!(
            "[{}] {} {}: {}",
            timestamp().dimmed(),
            "✗".red().bold(),
            stage.label(),
            error.to_string().red()
        );

        self.stage_results.push((
            stage,
            StageResult::Failed {
                error: error.to_string(),
                duration,
            },
        ));
    }
}

/// Render an account flag; `None` means the account lookup did not report it
fn flag(value: Option<bool>) -> colored::ColoredString {
    match value {
        Some(true) => "enabled".green(),
        Some(false) => "pending".yellow(),
        None => "unknown".dimmed(),
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Duration in a readable form
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}
