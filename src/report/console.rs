use crate::report::report_model::{RunReport, StepStatus, SuiteReport};

// ============================================================================
// Console reporter
// ============================================================================

/// Format a suite report for terminal output.
///
/// ```text
/// === Run: inline ===
///
/// ✓ PASS  zepto search on emulator-5554 (4 instructions)
/// ✗ FAIL  zepto search on R58M123 (4 instructions)
///     [failed] Search for 'Chocolates' -> search
///
/// === Results: 1 passed, 1 failed (2 total) ===
/// ```
pub fn format_console_report(report: &SuiteReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Run: {} ===\n\n", report.suite_name));

    for run in &report.runs {
        let marker = if run.passed() {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };

        out.push_str(&format!(
            "{}  {} on {} ({} instructions)\n",
            marker,
            run.script_name,
            run.device_id,
            run.outcomes.len()
        ));

        if let Some(ref error) = run.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }

        for outcome in run.failed_outcomes() {
            let line = outcome_line(
                outcome.status,
                &outcome.instruction,
                outcome.action.as_deref(),
                outcome.message.as_deref(),
            );
            out.push_str(&format!("    {}\n", line));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        report.passed, report.failed, report.total
    ));

    if let Some(ms) = report.duration_ms {
        out.push_str(&format!(" in {:.1}s", ms as f64 / 1000.0));
    }

    out.push_str(" ===\n");
    out
}

/// `[status] instruction -> action: message`
fn outcome_line(
    status: StepStatus,
    instruction: &str,
    action: Option<&str>,
    message: Option<&str>,
) -> String {
    let mut line = format!("[{}] {}", status.label(), instruction);
    if let Some(action) = action {
        line.push_str(" -> ");
        line.push_str(action);
    }
    if let Some(message) = message {
        line.push_str(": ");
        line.push_str(message);
    }
    line
}

/// One line per instruction, for `-v` progress output.
pub fn format_run_progress(run: &RunReport) -> String {
    run.outcomes
        .iter()
        .enumerate()
        .map(|(i, o)| {
            format!(
                "  {:>2}. {} ({}ms)\n",
                i + 1,
                outcome_line(o.status, &o.instruction, o.action.as_deref(), o.message.as_deref()),
                o.duration_ms
            )
        })
        .collect()
}
