use std::fmt;

use serde::Serialize;

use crate::driver::capability::LaunchCapability;
use crate::error::PilotResult;

/// How an element is looked up on the live surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "using", content = "value")]
pub enum Locator {
    /// Android resource id, e.g. `com.app:id/search_src_text`
    #[serde(rename = "id")]
    Id(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// W3C `using` strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Opaque element reference handed out by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        ElementHandle(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
}

impl Key {
    /// WebDriver key code point.
    pub fn code_point(self) -> &'static str {
        match self {
            Key::Enter => "\u{E007}",
        }
    }
}

/// Appium application state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    NotInstalled,
    NotRunning,
    SuspendedInBackground,
    RunningInBackground,
    RunningInForeground,
}

impl AppState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AppState::NotInstalled),
            1 => Some(AppState::NotRunning),
            2 => Some(AppState::SuspendedInBackground),
            3 => Some(AppState::RunningInBackground),
            4 => Some(AppState::RunningInForeground),
            _ => None,
        }
    }

    /// Foreground or background counts as running; suspended does not.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            AppState::RunningInBackground | AppState::RunningInForeground
        )
    }
}

/// Package + launch activity of the app under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppTarget {
    pub package: String,
    pub activity: String,
}

impl AppTarget {
    pub fn new(package: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            activity: activity.into(),
        }
    }
}

/// The automation driver as seen by the pipeline.
///
/// `find_elements` returns an empty list when nothing matches; it is not an
/// error. Every other command fails with a `PilotError` when the driver
/// rejects it.
pub trait UiDriver {
    /// Launch strategy chosen when the session was created.
    fn launch_capability(&self) -> LaunchCapability;

    fn page_source(&mut self) -> PilotResult<String>;

    fn find_elements(&mut self, locator: &Locator) -> PilotResult<Vec<ElementHandle>>;

    fn is_displayed(&mut self, element: &ElementHandle) -> PilotResult<bool>;

    fn is_enabled(&mut self, element: &ElementHandle) -> PilotResult<bool>;

    fn click(&mut self, element: &ElementHandle) -> PilotResult<()>;

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> PilotResult<()>;

    /// Press and release a key on the focused element.
    fn press_key(&mut self, key: Key) -> PilotResult<()>;

    /// PNG bytes of the current screen.
    fn screenshot_png(&mut self) -> PilotResult<Vec<u8>>;

    fn launch_app(&mut self, target: &AppTarget) -> PilotResult<()>;

    fn app_state(&mut self, package: &str) -> PilotResult<AppState>;

    /// Returns whether the app was actually terminated.
    fn terminate_app(&mut self, package: &str) -> PilotResult<bool>;

    fn quit(&mut self) -> PilotResult<()>;
}
