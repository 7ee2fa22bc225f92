use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use mobile_pilot::driver::capability::LaunchCapability;
use mobile_pilot::driver::driver_model::{AppState, AppTarget, ElementHandle, Key, Locator, UiDriver};
use mobile_pilot::driver::session::{AppSession, SessionSettings};
use mobile_pilot::error::{PilotError, PilotResult};
use mobile_pilot::locator::search_surface::LocatorSettings;

/// Everything the fake driver knows and everything it was asked to do.
pub struct FakeState {
    pub page_source: String,
    pub elements: HashMap<Locator, Vec<String>>,
    pub hidden: HashSet<String>,
    pub disabled: HashSet<String>,
    pub failing: HashSet<&'static str>,
    /// Remaining failures and their message, per command
    pub flaky: HashMap<&'static str, (usize, String)>,
    pub app_state: AppState,
    pub launch: LaunchCapability,
    pub screenshot: Vec<u8>,
    pub log: Vec<String>,
}

impl FakeState {
    pub fn logged(&self, entry: &str) -> bool {
        self.log.iter().any(|e| e == entry)
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

pub type FakeHandle = Rc<RefCell<FakeState>>;

/// In-memory `UiDriver`. Clone the handle before boxing the driver to
/// inspect the command log afterwards.
pub struct FakeDriver {
    state: FakeHandle,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeState {
                page_source: String::new(),
                elements: HashMap::new(),
                hidden: HashSet::new(),
                disabled: HashSet::new(),
                failing: HashSet::new(),
                flaky: HashMap::new(),
                app_state: AppState::NotRunning,
                launch: LaunchCapability::ActivateApp,
                screenshot: b"\x89PNG fake".to_vec(),
                log: Vec::new(),
            })),
        }
    }

    pub fn handle(&self) -> FakeHandle {
        Rc::clone(&self.state)
    }

    pub fn with_source(self, xml: &str) -> Self {
        self.state.borrow_mut().page_source = xml.to_string();
        self
    }

    pub fn with_element(self, locator: Locator, id: &str) -> Self {
        self.state
            .borrow_mut()
            .elements
            .entry(locator)
            .or_default()
            .push(id.to_string());
        self
    }

    pub fn hidden(self, id: &str) -> Self {
        self.state.borrow_mut().hidden.insert(id.to_string());
        self
    }

    pub fn disabled(self, id: &str) -> Self {
        self.state.borrow_mut().disabled.insert(id.to_string());
        self
    }

    /// Make every call of `command` fail with a driver error.
    pub fn failing(self, command: &'static str) -> Self {
        self.state.borrow_mut().failing.insert(command);
        self
    }

    /// Fail the next `times` calls of `command` with `message`, then recover.
    pub fn failing_times(self, command: &'static str, times: usize, message: &str) -> Self {
        self.state
            .borrow_mut()
            .flaky
            .insert(command, (times, message.to_string()));
        self
    }

    pub fn with_app_state(self, state: AppState) -> Self {
        self.state.borrow_mut().app_state = state;
        self
    }

    pub fn with_launch(self, launch: LaunchCapability) -> Self {
        self.state.borrow_mut().launch = launch;
        self
    }

    fn record(&self, command: &'static str, entry: String) -> PilotResult<()> {
        let mut state = self.state.borrow_mut();
        state.log.push(entry);
        if state.failing.contains(command) {
            return Err(PilotError::Driver {
                command: command.to_string(),
                message: "injected failure".to_string(),
            });
        }
        if let Some((left, message)) = state.flaky.get_mut(command) {
            if *left > 0 {
                *left -= 1;
                return Err(PilotError::Driver {
                    command: command.to_string(),
                    message: message.clone(),
                });
            }
        }
        Ok(())
    }
}

impl UiDriver for FakeDriver {
    fn launch_capability(&self) -> LaunchCapability {
        self.state.borrow().launch
    }

    fn page_source(&mut self) -> PilotResult<String> {
        self.record("page_source", "page_source".into())?;
        Ok(self.state.borrow().page_source.clone())
    }

    fn find_elements(&mut self, locator: &Locator) -> PilotResult<Vec<ElementHandle>> {
        self.record("find_elements", format!("find_elements:{}", locator))?;
        let state = self.state.borrow();
        Ok(state
            .elements
            .get(locator)
            .map(|ids| ids.iter().map(ElementHandle::new).collect())
            .unwrap_or_default())
    }

    fn is_displayed(&mut self, element: &ElementHandle) -> PilotResult<bool> {
        self.record("displayed", format!("displayed:{}", element.id()))?;
        Ok(!self.state.borrow().hidden.contains(element.id()))
    }

    fn is_enabled(&mut self, element: &ElementHandle) -> PilotResult<bool> {
        self.record("enabled", format!("enabled:{}", element.id()))?;
        Ok(!self.state.borrow().disabled.contains(element.id()))
    }

    fn click(&mut self, element: &ElementHandle) -> PilotResult<()> {
        self.record("click", format!("click:{}", element.id()))
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> PilotResult<()> {
        self.record("send_keys", format!("send_keys:{}:{}", element.id(), text))
    }

    fn press_key(&mut self, key: Key) -> PilotResult<()> {
        self.record("press_key", format!("press_key:{:?}", key))
    }

    fn screenshot_png(&mut self) -> PilotResult<Vec<u8>> {
        self.record("screenshot", "screenshot".into())?;
        Ok(self.state.borrow().screenshot.clone())
    }

    fn launch_app(&mut self, target: &AppTarget) -> PilotResult<()> {
        let launch = self.state.borrow().launch;
        self.record(
            "launch_app",
            format!("launch_app:{:?}:{}/{}", launch, target.package, target.activity),
        )
    }

    fn app_state(&mut self, package: &str) -> PilotResult<AppState> {
        self.record("app_state", format!("app_state:{}", package))?;
        Ok(self.state.borrow().app_state)
    }

    fn terminate_app(&mut self, package: &str) -> PilotResult<bool> {
        self.record("terminate_app", format!("terminate_app:{}", package))?;
        self.state.borrow_mut().app_state = AppState::NotRunning;
        Ok(true)
    }

    fn quit(&mut self) -> PilotResult<()> {
        self.record("quit", "quit".into())
    }
}

/// Locator timings short enough for tests.
pub fn fast_locator() -> LocatorSettings {
    LocatorSettings {
        label_timeout: Duration::from_millis(60),
        element_timeout: Duration::from_millis(60),
        poll_interval: Duration::from_millis(5),
    }
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        locator: fast_locator(),
        ..SessionSettings::default()
    }
}

pub fn target() -> AppTarget {
    AppTarget::new("com.zepto.app", ".MainActivity")
}

/// Session over `driver` plus a handle onto its state.
pub fn session_with(driver: FakeDriver) -> (AppSession, FakeHandle) {
    let handle = driver.handle();
    let session = AppSession::new(Box::new(driver), target(), "emulator-5554", fast_settings());
    (session, handle)
}
