//! Terminal output: ANSI styling, notes, and the analysis report.

use sightline_understanding::{AnalysisView, BannerKind};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Analysis report
// ---------------------------------------------------------------------------

/// Render an outcome view as terminal text.
pub fn render_view(view: &AnalysisView, color: bool) -> String {
    let paint = |style: &str, text: &str| {
        if color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    };

    let mut out = String::new();
    let banner = match view.banner.kind {
        BannerKind::Success => paint(GREEN, &format!("✓ {}", view.banner.text)),
        BannerKind::Error => paint(RED, &format!("✗ {}", view.banner.text)),
    };
    out.push_str(&banner);
    out.push('\n');

    if let Some(caption) = &view.caption {
        out.push_str(&format!("\n{}\n", paint(BOLD, "Caption")));
        out.push_str(&format!("  {}\n", paint(BOLD, &caption.text)));
        out.push_str(&format!("  {}\n", paint(DIM, &format!("Confidence: {}", caption.confidence))));
    }

    if let Some(tags) = &view.tags {
        out.push_str(&format!("\n{}\n  {tags}\n", paint(BOLD, "Tags")));
    }

    if !view.objects.is_empty() {
        out.push_str(&format!("\n{}\n", paint(BOLD, "Objects Detected")));
        for line in &view.objects {
            out.push_str(&format!("  • {line}\n"));
        }
    }

    out
}
