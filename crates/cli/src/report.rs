//! Human-readable run summary.

use std::fmt::Write;

use crossseed_core::RunSummary;

/// Exit status for a finished run: 1 when dispatch halted because every
/// backend was disabled, 2 when any release failed, 0 otherwise.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.halted {
        1
    } else if summary.has_failures() {
        2
    } else {
        0
    }
}

/// Render the summary as a table of counts followed by failure lines.
pub fn render(summary: &RunSummary) -> String {
    let mut out = String::new();
    let elapsed = summary.finished_at - summary.started_at;

    let _ = writeln!(out, "Cross-seed run finished in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    if summary.cancelled {
        let _ = writeln!(out, "  (cancelled, remaining releases were not processed)");
    }
    if summary.halted {
        let _ = writeln!(out, "  (halted, no indexer backend left)");
    }

    let rows = [
        ("releases found", summary.releases_found),
        ("releases scanned", summary.releases_scanned),
        ("  matched", summary.releases_matched),
        ("  unmatched", summary.releases_unmatched),
        ("  skipped", summary.releases_skipped),
        ("  failed", summary.releases_failed),
        ("matches found", summary.matches_found),
        ("  persisted", summary.matches_persisted),
        ("  already present", summary.matches_skipped),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{:<20}{:>8}", label, value);
    }

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "\nFailures:");
        for failure in &summary.failures {
            let _ = writeln!(
                out,
                "  {} [{}/{}] {}",
                failure.release_id,
                failure.stage.as_str(),
                failure.kind,
                failure.message
            );
        }
    }

    if !summary.backend_failures.is_empty() {
        let _ = writeln!(out, "\nBackend failures:");
        for failure in &summary.backend_failures {
            let _ = writeln!(
                out,
                "  {} [{}] {} ({} attempts{})",
                failure.backend,
                failure.kind,
                failure.message,
                failure.attempts,
                if failure.disabled { ", disabled" } else { "" }
            );
        }
    }

    out
}
