//! Progress reporting for orchestrated runs

use colored::Colorize;
use conductor_application::{ProgressEvent, ProgressListener};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a spinner-backed progress bar
///
/// The bar is created once the plan is known and grows when the adaptive
/// planner adds steps mid-run.
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn plan_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn task_line(step_id: &str, agent_type: &str, success: bool) -> String {
        if success {
            format!("{} {} ({})", "v".green(), step_id, agent_type.dimmed())
        } else {
            format!("{} {} ({})", "x".red(), step_id, agent_type.dimmed())
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for ProgressReporter {
    fn on_event(&self, event: &ProgressEvent) {
        let mut bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        match event {
            ProgressEvent::PlanningComplete { step_count, .. } => {
                let pb = ProgressBar::new(*step_count as u64);
                pb.set_style(Self::plan_style());
                pb.set_prefix("Executing plan");
                pb.set_message("Starting...");
                pb.enable_steady_tick(Duration::from_millis(100));
                *bar = Some(pb);
            }
            ProgressEvent::TaskStarted {
                step_id,
                agent_type,
                ..
            } => {
                if let Some(pb) = bar.as_ref() {
                    pb.set_message(format!("{} ({})", step_id, agent_type.dimmed()));
                }
            }
            ProgressEvent::TaskComplete {
                step_id,
                agent_type,
                success,
                ..
            } => {
                if let Some(pb) = bar.as_ref() {
                    if pb.position() >= pb.length().unwrap_or(0) {
                        pb.inc_length(1);
                    }
                    pb.set_message(Self::task_line(step_id, agent_type, *success));
                    pb.inc(1);
                }
            }
            ProgressEvent::AllComplete { success, .. } => {
                if let Some(pb) = bar.take() {
                    if *success {
                        pb.finish_with_message(format!("{}", "Plan complete!".green()));
                    } else {
                        pb.abandon_with_message(format!("{}", "Plan finished with failures".red()));
                    }
                }
            }
            ProgressEvent::Error { content, .. } => {
                if let Some(pb) = bar.take() {
                    pb.abandon_with_message(content.red().to_string());
                } else {
                    eprintln!("{} {}", "x".red(), content);
                }
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressListener for SimpleProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PlanningComplete { content, .. } => {
                println!("{} {}", "->".cyan(), content.bold());
            }
            ProgressEvent::TaskStarted { .. } => {}
            ProgressEvent::TaskComplete {
                step_id,
                agent_type,
                success,
                error,
                ..
            } => {
                let line = ProgressReporter::task_line(step_id, agent_type, *success);
                match error {
                    Some(error) if !success => println!("  {} - {}", line, error),
                    _ => println!("  {}", line),
                }
            }
            ProgressEvent::AllComplete { content, .. } => {
                println!("{} {}\n", "->".cyan(), content);
            }
            ProgressEvent::Error { content, .. } => {
                eprintln!("{} {}", "x".red(), content);
            }
        }
    }
}
