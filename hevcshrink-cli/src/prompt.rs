//! Interactive prompts.
//!
//! The core never prompts. When a value is missing on an interactive terminal
//! the encode command asks for it here, re-prompting until the answer is
//! valid. The run itself is confirmed with [`confirm_start`]; per-file deletion
//! questions are asked through [`TerminalConfirmer`].

use crate::cli_error;
use crate::error::CliResult;

use console::Term;
use hevcshrink_core::config::{
    BitrateMultiplier, MAX_BITRATE_MULTIPLIER, MIN_BITRATE_MULTIPLIER, MULTIPLIER_PRESETS,
};
use hevcshrink_core::processing::{DeletionConfirmer, SizeComparison};
use hevcshrink_core::progress_reporting;
use hevcshrink_core::{format_bytes, utils::get_filename_safe};
use owo_colors::OwoColorize;

use std::path::{Path, PathBuf};

/// Strips surrounding whitespace and one pair of matching quotes, as left
/// behind by dragging a folder into a terminal.
pub fn clean_directory_input(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Turns a typed directory into an absolute path to an existing directory.
pub fn resolve_directory_input(raw: &str) -> CliResult<PathBuf> {
    let cleaned = clean_directory_input(raw);
    if cleaned.is_empty() {
        return Err(cli_error!("No directory entered"));
    }
    let path = PathBuf::from(&cleaned);
    if !path.is_dir() {
        return Err(cli_error!("'{}' is not an existing directory", cleaned));
    }
    Ok(std::path::absolute(&path)?)
}

/// Parses a typed multiplier; empty input selects the default.
pub fn parse_multiplier_input(raw: &str) -> CliResult<BitrateMultiplier> {
    raw.parse()
}

/// Files listed by name before a run; the rest are only counted.
pub const PREVIEW_FILES: usize = 5;

/// An answer to the multiplier menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MultiplierChoice {
    Value(BitrateMultiplier),
    /// Ask for a number next
    Custom,
}

fn custom_index() -> usize {
    MULTIPLIER_PRESETS.len() + 1
}

/// The numbered preset menu, ending with the custom entry.
pub fn multiplier_menu() -> Vec<String> {
    let mut lines: Vec<String> = MULTIPLIER_PRESETS
        .iter()
        .enumerate()
        .map(|(i, (name, value))| {
            format!(
                "  {}. {:<8} {:>3.0}% of the original bitrate",
                i + 1,
                name,
                value * 100.0
            )
        })
        .collect();
    lines.push(format!("  {}. custom", custom_index()));
    lines
}

/// Parses a menu answer: an entry number, a preset name or `custom`. Empty
/// input selects the default.
pub fn parse_multiplier_choice(raw: &str) -> CliResult<MultiplierChoice> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(MultiplierChoice::Value(BitrateMultiplier::default()));
    }
    if trimmed.eq_ignore_ascii_case("custom") {
        return Ok(MultiplierChoice::Custom);
    }
    if let Some(preset) = BitrateMultiplier::from_preset(trimmed) {
        return Ok(MultiplierChoice::Value(preset));
    }
    match trimmed.parse::<usize>() {
        Ok(n) if n == custom_index() => Ok(MultiplierChoice::Custom),
        Ok(n) if (1..custom_index()).contains(&n) => {
            BitrateMultiplier::new(MULTIPLIER_PRESETS[n - 1].1).map(MultiplierChoice::Value)
        }
        _ => Err(cli_error!(
            "Choose 1-{} or a preset name",
            custom_index()
        )),
    }
}

/// Lines shown before a run: file count, total size and the first
/// [`PREVIEW_FILES`] files with their sizes.
pub fn format_run_preview(files: &[(PathBuf, u64)]) -> Vec<String> {
    let total: u64 = files.iter().map(|(_, size)| size).sum();
    let mut lines = vec![
        format!("Files to process: {}", files.len()),
        format!("Total size:       {}", format_bytes(total)),
    ];
    for (i, (path, size)) in files.iter().take(PREVIEW_FILES).enumerate() {
        let name = get_filename_safe(path).unwrap_or_else(|_| path.display().to_string());
        lines.push(format!("  {}. {} ({})", i + 1, name, format_bytes(*size)));
    }
    if files.len() > PREVIEW_FILES {
        lines.push(format!("  ... and {} more", files.len() - PREVIEW_FILES));
    }
    lines
}

/// `Some(true)` for yes, `Some(false)` for no or empty, `None` otherwise.
pub fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

fn ask(term: &Term, question: &str) -> CliResult<String> {
    term.write_str(question)?;
    Ok(term.read_line()?)
}

fn complain(term: &Term, message: &str) {
    let _ = term.write_line(&format!("  {}", message.red()));
}

/// Asks for the target directory until an existing one is given.
pub fn prompt_directory(term: &Term) -> CliResult<PathBuf> {
    loop {
        let answer = ask(term, "Directory to process: ")?;
        match resolve_directory_input(&answer) {
            Ok(path) => return Ok(path),
            Err(e) => complain(term, &e.to_string()),
        }
    }
}

/// Offers the preset menu, then asks for a custom value if that was chosen.
pub fn prompt_multiplier(term: &Term) -> CliResult<BitrateMultiplier> {
    term.write_line("Bitrate presets:")?;
    for line in multiplier_menu() {
        term.write_line(&line)?;
    }
    let question = format!("Preset (1-{}, Enter for medium): ", custom_index());
    loop {
        let answer = ask(term, &question)?;
        match parse_multiplier_choice(&answer) {
            Ok(MultiplierChoice::Value(multiplier)) => return Ok(multiplier),
            Ok(MultiplierChoice::Custom) => break,
            Err(e) => complain(term, &e.to_string()),
        }
    }

    let question = format!(
        "Custom multiplier ({MIN_BITRATE_MULTIPLIER}-{MAX_BITRATE_MULTIPLIER}, Enter for {}): ",
        BitrateMultiplier::default().value()
    );
    loop {
        let answer = ask(term, &question)?;
        match parse_multiplier_input(&answer) {
            Ok(multiplier) => return Ok(multiplier),
            Err(e) => complain(term, &e.to_string()),
        }
    }
}

/// Shows what is about to be processed and asks to go ahead.
pub fn confirm_start(term: &Term, files: &[(PathBuf, u64)]) -> CliResult<bool> {
    term.write_line("")?;
    for line in format_run_preview(files) {
        term.write_line(&line)?;
    }
    confirm(term, &format!("Start processing {} files?", files.len()))
}

/// Asks a yes/no question; anything but an explicit yes is no.
pub fn confirm(term: &Term, question: &str) -> CliResult<bool> {
    loop {
        let answer = ask(term, &format!("{question} [y/N]: "))?;
        match parse_yes_no(&answer) {
            Some(yes) => return Ok(yes),
            None => complain(term, "Please answer y or n"),
        }
    }
}

/// Up-front confirmation for deleting every original in `dir`. Asked twice.
pub fn confirm_delete_all(term: &Term, dir: &Path) -> CliResult<bool> {
    term.write_line(&format!(
        "{} originals under {} will be deleted after each successful encode.",
        "Warning:".yellow().bold(),
        dir.display()
    ))?;
    if !confirm(term, "Delete originals without asking per file?")? {
        return Ok(false);
    }
    confirm(term, "Are you sure? This cannot be undone.")
}

/// Asks on the terminal before each deletion.
pub struct TerminalConfirmer {
    term: Term,
}

impl TerminalConfirmer {
    pub fn new(term: Term) -> Self {
        Self { term }
    }
}

impl DeletionConfirmer for TerminalConfirmer {
    fn confirm_delete(&self, original: &Path, comparison: &SizeComparison) -> bool {
        progress_reporting::clear_progress();
        let name = get_filename_safe(original).unwrap_or_else(|_| original.display().to_string());
        let question = format!(
            "Delete {} ({} -> {}, {:+.1}%)?",
            name,
            format_bytes(comparison.original_size),
            format_bytes(comparison.encoded_size),
            comparison.percent_change()
        );
        if !comparison.is_beneficial() {
            complain(&self.term, "The encoded file is not smaller than the original");
        }
        match confirm(&self.term, &question) {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("Could not read answer, keeping original: {}", e);
                false
            }
        }
    }
}
