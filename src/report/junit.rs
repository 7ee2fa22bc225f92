use crate::report::report_model::SuiteReport;

// ============================================================================
// JUnit XML reporter
// ============================================================================

/// JUnit XML with one `<testcase>` per device run.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <testsuite name="..." tests="2" failures="1" time="12.040">
///   <testcase name="zepto search" classname="mobile-pilot.emulator-5554" />
///   <testcase name="zepto search" classname="mobile-pilot.R58M123">
///     <failure message="1 instruction(s) failed" type="InstructionFailure">...</failure>
///   </testcase>
/// </testsuite>
/// ```
pub fn generate_junit_xml(report: &SuiteReport) -> String {
    let time_attr = report
        .duration_ms
        .map(|ms| format!(" time=\"{:.3}\"", ms as f64 / 1000.0))
        .unwrap_or_default();

    let mut cases = String::new();
    for run in &report.runs {
        let classname = format!("mobile-pilot.{}", run.device_id);
        if run.passed() {
            cases.push_str(&format!(
                "  <testcase name=\"{}\" classname=\"{}\" />\n",
                escape_xml(&run.script_name),
                escape_xml(&classname)
            ));
            continue;
        }

        let mut body_parts: Vec<String> = run
            .failed_outcomes()
            .map(|o| {
                let mut part = format!("[{}] {}", o.status.label(), o.instruction);
                if let Some(ref message) = o.message {
                    part.push_str(": ");
                    part.push_str(message);
                }
                part
            })
            .collect();
        let failure_count = body_parts.len();

        if let Some(ref error) = run.error {
            body_parts.push(format!("Error: {}", error));
        }

        let (message, kind) = if run.error.is_some() {
            ("run aborted".to_string(), "RunError")
        } else {
            (
                format!("{} instruction(s) failed", failure_count),
                "InstructionFailure",
            )
        };

        cases.push_str(&format!(
            "  <testcase name=\"{name}\" classname=\"{classname}\">\n    <failure message=\"{message}\" type=\"{kind}\">{body}</failure>\n  </testcase>\n",
            name = escape_xml(&run.script_name),
            classname = escape_xml(&classname),
            message = escape_xml(&message),
            kind = kind,
            body = escape_xml(&body_parts.join("\n")),
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite name=\"{name}\" tests=\"{tests}\" failures=\"{failures}\"{time}>\n{cases}</testsuite>\n",
        name = escape_xml(&report.suite_name),
        tests = report.total,
        failures = report.failed,
        time = time_attr,
        cases = cases,
    )
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
