use serde::{Deserialize, Serialize};

// ============================================================================
// Per-instruction outcome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Handler reported success
    Completed,
    /// Handler ran but reported a soft failure
    SoftFailed,
    /// Action name outside the catalog
    Unhandled,
    /// The instruction could not be resolved to an action
    Unresolved,
    /// A collaborator failed and the device run stopped here
    Errored,
}

impl StepStatus {
    pub fn label(self) -> &'static str {
        match self {
            StepStatus::Completed => "ok",
            StepStatus::SoftFailed => "failed",
            StepStatus::Unhandled => "unhandled",
            StepStatus::Unresolved => "unresolved",
            StepStatus::Errored => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionOutcome {
    pub instruction: String,

    /// Resolved catalog name, if the instruction resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    pub status: StepStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub duration_ms: u128,
}

// ============================================================================
// Per-device run
// ============================================================================

/// One script executed on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub script_name: String,
    pub device_id: String,

    /// Package the app name resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_package: Option<String>,

    pub outcomes: Vec<InstructionOutcome>,

    /// Set when the run stopped early (no session, app missing, driver down)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(script_name: &str, device_id: &str) -> Self {
        Self {
            script_name: script_name.to_string(),
            device_id: device_id.to_string(),
            app_package: None,
            outcomes: Vec::new(),
            error: None,
        }
    }

    /// No run error and every instruction completed.
    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self
                .outcomes
                .iter()
                .all(|o| o.status == StepStatus::Completed)
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &InstructionOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != StepStatus::Completed)
    }
}

// ============================================================================
// Suite report: aggregates device runs
// ============================================================================

/// Aggregated report over every device run of a CLI invocation.
///
/// Consumed by the console and JUnit reporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite_name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub runs: Vec<RunReport>,
}

impl SuiteReport {
    pub fn from_runs(suite_name: &str, runs: Vec<RunReport>) -> Self {
        let total = runs.len();
        let passed = runs.iter().filter(|r| r.passed()).count();
        Self {
            suite_name: suite_name.to_string(),
            total,
            passed,
            failed: total - passed,
            duration_ms: None,
            runs,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
