use std::path::PathBuf;

use tracing::{info, warn};

use crate::driver::driver_model::{AppTarget, UiDriver};
use crate::driver::remote::{DriverSettings, RemoteDriver, SessionCapabilities};
use crate::error::PilotResult;
use crate::locator::search_surface::LocatorSettings;

/// Per-session knobs handed to action handlers.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub locator: LocatorSettings,
    /// Parent of the default `<root>/<package>` screenshot directory
    pub screenshot_root: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            locator: LocatorSettings::default(),
            screenshot_root: PathBuf::from("./screenshots"),
        }
    }
}

/// One driver session bound to one app on one device.
pub struct AppSession {
    driver: Box<dyn UiDriver>,
    pub target: AppTarget,
    pub device_id: String,
    pub platform_version: Option<String>,
    pub settings: SessionSettings,
    closed: bool,
}

impl AppSession {
    pub fn new(
        driver: Box<dyn UiDriver>,
        target: AppTarget,
        device_id: impl Into<String>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            driver,
            target,
            device_id: device_id.into(),
            platform_version: None,
            settings,
            closed: false,
        }
    }

    /// Open a remote session for `target` on `device_id`.
    pub fn connect(
        driver_settings: &DriverSettings,
        device_id: &str,
        platform_version: Option<&str>,
        target: AppTarget,
        settings: SessionSettings,
    ) -> PilotResult<Self> {
        let capabilities = SessionCapabilities::android(
            device_id,
            &target,
            platform_version,
            driver_settings.new_command_timeout_secs,
        );
        let driver = RemoteDriver::connect(driver_settings, capabilities)?;
        let mut session = Self::new(Box::new(driver), target, device_id, settings);
        session.platform_version = platform_version.map(str::to_string);
        Ok(session)
    }

    pub fn driver(&mut self) -> &mut dyn UiDriver {
        self.driver.as_mut()
    }

    pub fn is_app_running(&mut self) -> PilotResult<bool> {
        let package = self.target.package.clone();
        Ok(self.driver.app_state(&package)?.is_running())
    }

    pub fn kill_app(&mut self) -> PilotResult<bool> {
        let package = self.target.package.clone();
        let terminated = self.driver.terminate_app(&package)?;
        info!(package = %package, terminated, "terminated app");
        Ok(terminated)
    }

    /// Start from a cold app: terminate it if it is already running.
    ///
    /// Failures are logged and the run goes on with the app as it is.
    pub fn manage_state(&mut self) -> PilotResult<()> {
        match self.is_app_running() {
            Ok(true) => {
                if let Err(e) = self.kill_app() {
                    warn!(package = %self.target.package, error = %e, "could not terminate app");
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!(package = %self.target.package, error = %e, "could not query app state");
            }
        }
        Ok(())
    }

    pub fn quit(&mut self) -> PilotResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.quit()
    }
}

impl Drop for AppSession {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!(device = %self.device_id, error = %e, "session quit failed");
        }
    }
}
