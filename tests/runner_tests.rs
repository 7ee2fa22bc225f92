mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::fake_driver::{FakeDriver, FakeHandle, fast_settings, session_with};
use common::fixtures::{HOME_SEARCH_ID, fixture};
use common::runner::FakeRunner;
use common::scripted::scripted_parser;
use mobile_pilot::device::adb::{Adb, AdbSettings};
use mobile_pilot::driver::driver_model::{AppState, Locator};
use mobile_pilot::driver::session::AppSession;
use mobile_pilot::error::PilotError;
use mobile_pilot::locator::search_surface::{SEARCH_INPUT_XPATH, SEARCH_LABEL_XPATH};
use mobile_pilot::report::report_model::{RunReport, StepStatus};
use mobile_pilot::script::runner::ScriptRunner;
use mobile_pilot::script::script_model::InstructionScript;

fn full_driver() -> FakeDriver {
    FakeDriver::new()
        .with_app_state(AppState::RunningInForeground)
        .with_source(&fixture("home_screen.xml"))
        .with_element(Locator::id("search_box"), "box-1")
        .with_element(Locator::xpath(SEARCH_LABEL_XPATH), "label-1")
        .with_element(Locator::id(HOME_SEARCH_ID), "bar-1")
        .with_element(Locator::xpath(SEARCH_INPUT_XPATH), "input-1")
}

fn instructions(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

fn statuses(report: &RunReport) -> Vec<StepStatus> {
    report.outcomes.iter().map(|o| o.status).collect()
}

// ============================================================================
// run_instructions
// ============================================================================

#[test]
fn every_instruction_runs_in_order() {
    let (parser, requests) = scripted_parser([
        "Action: open_app\nParameters:",
        "Action: wait_for_screen\nParameters: timeout=1",
        "Action: search\nParameters: query=Chocolates",
    ]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let (mut session, handle) = session_with(full_driver());
    let mut report = RunReport::new("demo", "emulator-5554");

    let lines = instructions(&["Open the app", "Wait for home", "Search for 'Chocolates'"]);
    runner.run_instructions(&mut session, &lines, &mut report).unwrap();

    assert_eq!(requests.borrow().len(), 3);
    assert_eq!(
        statuses(&report),
        vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Completed]
    );
    assert_eq!(report.outcomes[2].action.as_deref(), Some("search"));
    assert!(report.passed());
    assert!(handle.borrow().logged("send_keys:input-1:Chocolates"));
}

#[test]
fn unresolved_and_unhandled_steps_do_not_stop_the_run() {
    let (parser, _) = scripted_parser([
        "I am not sure what you mean",
        "Action: take_screenshot\nParameters: output_path=/nonexistent\u{0}/x",
        "Action: open_app",
    ]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let (mut session, handle) = session_with(full_driver());
    let mut report = RunReport::new("demo", "emulator-5554");

    let lines = instructions(&["gibberish", "Take a screenshot", "Open the app"]);
    runner.run_instructions(&mut session, &lines, &mut report).unwrap();

    assert_eq!(
        statuses(&report),
        vec![StepStatus::Unresolved, StepStatus::SoftFailed, StepStatus::Completed]
    );
    assert!(report.outcomes[0].action.is_none());
    assert!(!report.passed());
    assert_eq!(handle.borrow().count("launch_app"), 1);
}

#[test]
fn handler_error_stops_the_run() {
    let (parser, requests) = scripted_parser(["Action: open_app", "Action: open_app"]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let (mut session, _) = session_with(full_driver().failing("launch_app"));
    let mut report = RunReport::new("demo", "emulator-5554");

    let lines = instructions(&["Open the app", "Open it again"]);
    let err = runner
        .run_instructions(&mut session, &lines, &mut report)
        .unwrap_err();

    assert!(matches!(err, PilotError::Driver { .. }));
    assert_eq!(requests.borrow().len(), 1);
    assert_eq!(statuses(&report), vec![StepStatus::Errored]);
    assert!(report.outcomes[0].message.is_some());
}

// ============================================================================
// run_on_device
// ============================================================================

fn demo_script() -> InstructionScript {
    InstructionScript::from_lines("grocery", "zepto", ["Open the app", "", "Search for milk"])
}

fn connect_with(
    handle_slot: Rc<RefCell<Option<FakeHandle>>>,
    driver: FakeDriver,
) -> impl FnOnce(
    &mobile_pilot::device::adb::DeviceInfo,
    mobile_pilot::driver::driver_model::AppTarget,
) -> mobile_pilot::error::PilotResult<AppSession> {
    move |info, target| {
        *handle_slot.borrow_mut() = Some(driver.handle());
        Ok(AppSession::new(
            Box::new(driver),
            target,
            info.device_id.clone(),
            fast_settings(),
        ))
    }
}

#[test]
fn device_run_resets_app_runs_and_quits() {
    let (parser, _) = scripted_parser(["Action: open_app", "Action: search\nParameters: query=milk"]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let adb = Adb::new(
        FakeRunner::with_device("emu-1", "Pixel 7", "14", &["com.android.chrome", "com.zepto.app"]),
        &AdbSettings::default(),
    );
    let slot = Rc::new(RefCell::new(None));

    let report = runner.run_on_device(&adb, "emu-1", &demo_script(), connect_with(slot.clone(), full_driver()));

    assert!(report.passed(), "{report:?}");
    assert_eq!(report.app_package.as_deref(), Some("com.zepto.app"));
    assert_eq!(report.outcomes.len(), 2);

    let handle = slot.borrow().clone().unwrap();
    let state = handle.borrow();
    assert!(state.logged("terminate_app:com.zepto.app"));
    assert!(state.logged("launch_app:ActivateApp:com.zepto.app/.MainActivity"));
    assert_eq!(state.log.last().map(String::as_str), Some("quit"));
    assert_eq!(state.count("quit"), 1);
}

#[test]
fn missing_app_aborts_before_connecting() {
    let (parser, requests) = scripted_parser(["Action: open_app"]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let adb = Adb::new(
        FakeRunner::with_device("emu-1", "Pixel 7", "14", &["com.android.chrome"]),
        &AdbSettings::default(),
    );
    let slot = Rc::new(RefCell::new(None));

    let report = runner.run_on_device(&adb, "emu-1", &demo_script(), connect_with(slot.clone(), full_driver()));

    assert!(!report.passed());
    let error = report.error.unwrap();
    assert!(error.contains("zepto"), "{error}");
    assert!(error.contains("Pixel 7"), "{error}");
    assert!(slot.borrow().is_none());
    assert!(requests.borrow().is_empty());
}

#[test]
fn session_failure_is_reported_per_device() {
    let (parser, _) = scripted_parser(["Action: open_app"]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let adb = Adb::new(
        FakeRunner::with_device("emu-1", "Pixel 7", "14", &["com.zepto.app"]),
        &AdbSettings::default(),
    );

    let report = runner.run_on_device(&adb, "emu-1", &demo_script(), |_, _| {
        Err(PilotError::SessionSetup("connection refused".into()))
    });

    assert_eq!(report.app_package.as_deref(), Some("com.zepto.app"));
    assert!(report.outcomes.is_empty());
    assert!(report.error.unwrap().contains("connection refused"));
}

#[test]
fn unreadable_device_properties_fall_back_to_serial() {
    let (parser, _) = scripted_parser(["Action: open_app"]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let runner_adb = FakeRunner::new().respond(
        "-s emu-9 shell pm list packages",
        mobile_pilot::device::adb::CommandOutput::ok("package:com.zepto.app\n"),
    );
    let adb = Adb::new(runner_adb, &AdbSettings::default());
    let seen = Rc::new(RefCell::new(None));
    let seen_in = seen.clone();

    let script = InstructionScript::from_lines("s", "zepto", ["Open the app"]);
    let report = runner.run_on_device(&adb, "emu-9", &script, move |info, target| {
        *seen_in.borrow_mut() = Some(info.clone());
        Ok(AppSession::new(Box::new(FakeDriver::new()), target, "emu-9", fast_settings()))
    });

    assert!(report.passed(), "{report:?}");
    let info = seen.borrow().clone().unwrap();
    assert_eq!(info.device_name, "emu-9");
    assert_eq!(info.platform_version, "");
}

#[test]
fn app_state_failure_does_not_abort_the_device_run() {
    let (parser, requests) = scripted_parser(["Action: open_app", "Action: search\nParameters: query=milk"]);
    let runner = ScriptRunner::new(&parser, Duration::ZERO);
    let adb = Adb::new(
        FakeRunner::with_device("emu-1", "Pixel 7", "14", &["com.zepto.app"]),
        &AdbSettings::default(),
    );
    let slot = Rc::new(RefCell::new(None));

    let driver = full_driver().failing("app_state");
    let report = runner.run_on_device(&adb, "emu-1", &demo_script(), connect_with(slot.clone(), driver));

    assert!(report.error.is_none(), "{report:?}");
    assert!(report.passed(), "{report:?}");
    assert_eq!(requests.borrow().len(), 2);

    let handle = slot.borrow().clone().unwrap();
    assert_eq!(handle.borrow().count("terminate_app"), 0);
    assert_eq!(handle.borrow().count("launch_app"), 1);
}
