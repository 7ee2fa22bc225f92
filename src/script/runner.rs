use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::actions::dispatcher::{DispatchOutcome, dispatch};
use crate::device::adb::{Adb, CommandRunner, DeviceInfo};
use crate::driver::driver_model::AppTarget;
use crate::driver::session::AppSession;
use crate::error::{PilotError, PilotResult};
use crate::llm::instruction::InstructionParser;
use crate::report::report_model::{InstructionOutcome, RunReport, StepStatus};
use crate::script::script_model::InstructionScript;

/// Executes instruction scripts one device at a time.
pub struct ScriptRunner<'p> {
    parser: &'p InstructionParser,
    step_delay: Duration,
}

impl<'p> ScriptRunner<'p> {
    pub fn new(parser: &'p InstructionParser, step_delay: Duration) -> Self {
        Self { parser, step_delay }
    }

    /// Resolve and dispatch each instruction in order, appending outcomes to
    /// `report`.
    ///
    /// Unresolved, unhandled and soft-failed instructions are recorded and
    /// the run continues. A handler error is recorded and returned.
    pub fn run_instructions(
        &self,
        session: &mut AppSession,
        instructions: &[String],
        report: &mut RunReport,
    ) -> PilotResult<()> {
        for (i, instruction) in instructions.iter().enumerate() {
            if i > 0 && !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }

            info!(step = i + 1, total = instructions.len(), instruction = %instruction, "executing instruction");
            let start = Instant::now();

            let Some(action) = self.parser.interpret(instruction) else {
                report.outcomes.push(outcome(
                    instruction,
                    None,
                    StepStatus::Unresolved,
                    Some("could not resolve instruction to an action".into()),
                    start,
                ));
                continue;
            };

            let name = Some(action.name.clone());
            let (status, message) = match dispatch(session, &action) {
                Ok(DispatchOutcome::Completed { .. }) => (StepStatus::Completed, None),
                Ok(DispatchOutcome::SoftFailure { .. }) => (StepStatus::SoftFailed, None),
                Ok(DispatchOutcome::Unhandled { name: unknown }) => (
                    StepStatus::Unhandled,
                    Some(format!("no handler defined for action '{}'", unknown)),
                ),
                Err(e) => {
                    report.outcomes.push(outcome(
                        instruction,
                        name,
                        StepStatus::Errored,
                        Some(e.to_string()),
                        start,
                    ));
                    return Err(e);
                }
            };
            report
                .outcomes
                .push(outcome(instruction, name, status, message, start));
        }
        Ok(())
    }

    /// Run `script` on `device_id`: resolve the app package, open a session
    /// through `connect`, reset the app, run the instructions, quit.
    ///
    /// Failures end this device's run and land in the report.
    pub fn run_on_device<R, C>(
        &self,
        adb: &Adb<R>,
        device_id: &str,
        script: &InstructionScript,
        connect: C,
    ) -> RunReport
    where
        R: CommandRunner,
        C: FnOnce(&DeviceInfo, AppTarget) -> PilotResult<AppSession>,
    {
        let mut report = RunReport::new(&script.name, device_id);
        info!(device = device_id, script = %script.name, "running script on device");

        if let Err(e) = self.run_device_inner(adb, device_id, script, connect, &mut report) {
            error!(device = device_id, error = %e, "device run aborted");
            report.error = Some(e.to_string());
        }
        report
    }

    fn run_device_inner<R, C>(
        &self,
        adb: &Adb<R>,
        device_id: &str,
        script: &InstructionScript,
        connect: C,
        report: &mut RunReport,
    ) -> PilotResult<()>
    where
        R: CommandRunner,
        C: FnOnce(&DeviceInfo, AppTarget) -> PilotResult<AppSession>,
    {
        let info = adb.device_info(device_id).unwrap_or_else(|e| {
            warn!(device = device_id, error = %e, "could not read device properties");
            DeviceInfo {
                device_name: device_id.to_string(),
                platform_version: String::new(),
                device_id: device_id.to_string(),
            }
        });

        let package = adb
            .find_app_by_name(&script.app, device_id)?
            .ok_or_else(|| PilotError::AppNotInstalled {
                app: script.app.clone(),
                device: info.device_name.clone(),
            })?;
        report.app_package = Some(package.clone());

        let mut session = connect(&info, AppTarget::new(package, script.activity.clone()))?;
        let result = session
            .manage_state()
            .and_then(|()| self.run_instructions(&mut session, &script.instructions, report));

        if let Err(e) = session.quit() {
            warn!(device = device_id, error = %e, "failed to quit session");
        }
        result
    }
}

fn outcome(
    instruction: &str,
    action: Option<String>,
    status: StepStatus,
    message: Option<String>,
    start: Instant,
) -> InstructionOutcome {
    InstructionOutcome {
        instruction: instruction.to_string(),
        action,
        status,
        message,
        duration_ms: start.elapsed().as_millis(),
    }
}
