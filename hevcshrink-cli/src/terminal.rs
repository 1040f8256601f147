//! Terminal rendering of core progress output.
//!
//! [`TerminalReporter`] is registered with the core's progress reporting API
//! at startup. Text output is emitted through `log::info!` so that it reaches
//! both the console and the run log; the encode progress bar is drawn on
//! stderr with indicatif and only when stderr is a terminal.

use hevcshrink_core::format_duration;
use hevcshrink_core::progress_reporting::{OutputLevel, ProgressReporter};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

use std::io::IsTerminal;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const LABEL_WIDTH: usize = 18;
const BAR_STEPS: u64 = 1000;

static USE_COLOR: AtomicBool = AtomicBool::new(false);

/// Decides once whether colored output is used.
///
/// Color is off with `--no-color`, when `NO_COLOR` is set, or when stdout
/// does not support it.
pub fn init_color(no_color: bool) -> bool {
    let enabled = !no_color
        && std::env::var_os("NO_COLOR").is_none()
        && supports_color::on(supports_color::Stream::Stdout).is_some();
    USE_COLOR.store(enabled, Ordering::Relaxed);
    enabled
}

pub fn should_use_color() -> bool {
    USE_COLOR.load(Ordering::Relaxed)
}

/// `label:` padded to a fixed display width.
fn pad_label(label: &str) -> String {
    let width = label.width() + 1;
    let padding = LABEL_WIDTH.saturating_sub(width).max(1);
    format!("{}:{}", label, " ".repeat(padding))
}

fn format_level(level: OutputLevel, text: &str, color: bool) -> Vec<String> {
    match level {
        OutputLevel::Section => {
            let title = text.to_uppercase();
            let title = if color {
                title.cyan().bold().to_string()
            } else {
                title
            };
            vec![String::new(), format!("===== {title} ====="), String::new()]
        }
        OutputLevel::Processing => {
            let text = if color {
                text.bold().to_string()
            } else {
                text.to_string()
            };
            vec![String::new(), format!("  » {text}")]
        }
        OutputLevel::Success if color => vec![format!("  ✓ {}", text.green())],
        OutputLevel::Success => vec![format!("  ✓ {text}")],
        OutputLevel::Error if color => vec![format!("  ✗ {}", text.red().bold())],
        OutputLevel::Error => vec![format!("  ✗ {text}")],
        OutputLevel::Warning if color => vec![format!("  ⚠ {}", text.yellow())],
        OutputLevel::Warning => vec![format!("  ⚠ {text}")],
        OutputLevel::Info => vec![format!("    {text}")],
    }
}

fn format_status(label: &str, value: &str, highlight: bool, color: bool) -> String {
    let value = if color && highlight {
        value.bold().to_string()
    } else {
        value.to_string()
    };
    format!("    {}{}", pad_label(label), value)
}

fn new_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(BAR_STEPS);
    let style = ProgressStyle::default_bar()
        .template("  ⧖ Encoding: {percent:>3}% [{bar:30}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##.");
    pb.set_style(style);

    if std::io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(200));
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb
}

/// Progress reporter for an interactive or logged CLI session.
#[derive(Default)]
pub struct TerminalReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, lines: &[String]) {
        let guard = self.bar.lock().ok();
        match guard.as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.suspend(|| {
                for line in lines {
                    info!("{line}");
                }
            }),
            None => {
                for line in lines {
                    info!("{line}");
                }
            }
        }
    }
}

impl ProgressReporter for TerminalReporter {
    fn output(&self, level: OutputLevel, text: &str) {
        self.emit(&format_level(level, text, should_use_color()));
    }

    fn output_status(&self, label: &str, value: &str, highlight: bool) {
        self.emit(&[format_status(label, value, highlight, should_use_color())]);
    }

    fn progress_bar(&self, percent: f32, elapsed_secs: f64, total_secs: f64) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(new_progress_bar);
        let position = (f64::from(percent.clamp(0.0, 100.0)) * BAR_STEPS as f64 / 100.0) as u64;
        pb.set_position(position);
        pb.set_message(format!(
            "{} / {}",
            format_duration(elapsed_secs),
            format_duration(total_secs)
        ));
    }

    fn clear_progress_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
