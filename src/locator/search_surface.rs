use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::driver::driver_model::{Key, Locator, UiDriver};
use crate::driver::wait::{Wait, first_clickable, first_visible};
use crate::error::{PilotError, PilotResult};
use crate::screen::scanner::identify_search_surfaces;

/// Visible text label mentioning "search", matched case-insensitively.
pub const SEARCH_LABEL_XPATH: &str = "//android.widget.TextView[contains(translate(@text, 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'search')]";

/// Text field that shows a "Search ..." hint once the surface is open.
pub const SEARCH_INPUT_XPATH: &str = "//*[contains(@text, 'Search ')]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorState {
    Idle,
    LabelWait,
    Found,
    Scan,
    Ranked,
    ElementWait,
    Typed,
    Submitted,
    /// No label became visible in time
    TimedOut,
    /// No ranked candidate carried a resource id
    ScanEmpty,
    /// The driver rejected a command
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorSettings {
    pub label_timeout: Duration,
    pub element_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            label_timeout: Duration::from_secs(10),
            element_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Finds and drives the on-screen search control.
pub struct SearchSurfaceLocator<'s, D: UiDriver + ?Sized> {
    driver: &'s mut D,
    settings: LocatorSettings,
    state: LocatorState,
}

impl<'s, D: UiDriver + ?Sized> SearchSurfaceLocator<'s, D> {
    pub fn new(driver: &'s mut D, settings: LocatorSettings) -> Self {
        Self {
            driver,
            settings,
            state: LocatorState::Idle,
        }
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    /// Resource id of the best search candidate on screen.
    ///
    /// Waits up to `timeout` for a search label to appear, then scans the
    /// page source. Returns `None` when no label shows up, when no candidate
    /// has a resource id, or when the driver fails.
    pub fn locate(&mut self, timeout: Duration) -> Option<String> {
        match self.try_locate(timeout) {
            Ok(found) => found,
            Err(e) if e.is_timeout() => {
                self.state = LocatorState::TimedOut;
                warn!(timeout_ms = timeout.as_millis() as u64, "no search label found");
                None
            }
            Err(e) => {
                self.state = LocatorState::Failed;
                warn!(error = %e, "failed to locate search surface");
                None
            }
        }
    }

    fn try_locate(&mut self, timeout: Duration) -> PilotResult<Option<String>> {
        self.state = LocatorState::LabelWait;
        let label = Locator::xpath(SEARCH_LABEL_XPATH);
        Wait::new(timeout, self.settings.poll_interval).until(
            &mut *self.driver,
            "search label visible",
            |d| first_visible(d, &label),
        )?;
        self.state = LocatorState::Found;
        debug!("search label visible, scanning page source");

        self.state = LocatorState::Scan;
        let source = self.driver.page_source()?;
        let ranked = identify_search_surfaces(&source);
        self.state = LocatorState::Ranked;

        let Some(best) = ranked.first() else {
            self.state = LocatorState::ScanEmpty;
            warn!("no identifiable search surface");
            return Ok(None);
        };
        match best.resource_id() {
            Some(id) if !id.is_empty() => {
                info!(
                    resource_id = id,
                    path = %best.path,
                    candidates = ranked.len(),
                    "search surface located"
                );
                Ok(Some(id.to_string()))
            }
            _ => {
                self.state = LocatorState::ScanEmpty;
                warn!(path = %best.path, "best search candidate has no resource id");
                Ok(None)
            }
        }
    }

    /// Open the surface `identifier`, type `term` and submit it.
    pub fn search(&mut self, term: &str, identifier: &str) -> bool {
        match self.try_search(term, identifier) {
            Ok(()) => {
                info!(term, identifier, "search submitted");
                true
            }
            Err(e) => {
                if !e.is_timeout() {
                    self.state = LocatorState::Failed;
                }
                warn!(term, identifier, error = %e, "search failed");
                false
            }
        }
    }

    fn try_search(&mut self, term: &str, identifier: &str) -> PilotResult<()> {
        let wait = Wait::new(self.settings.element_timeout, self.settings.poll_interval);
        self.state = LocatorState::ElementWait;

        let surface = Locator::id(identifier);
        let element = wait
            .until(&mut *self.driver, "search surface clickable", |d| {
                first_clickable(d, &surface)
            })
            .map_err(|e| self.note_timeout(e))?;
        self.driver.click(&element)?;
        debug!(identifier, "clicked search surface");

        let input = Locator::xpath(SEARCH_INPUT_XPATH);
        let field = wait
            .until(&mut *self.driver, "search input visible", |d| {
                first_visible(d, &input)
            })
            .map_err(|e| self.note_timeout(e))?;
        self.driver.send_keys(&field, term)?;
        self.state = LocatorState::Typed;

        self.driver.press_key(Key::Enter)?;
        self.state = LocatorState::Submitted;
        Ok(())
    }

    fn note_timeout(&mut self, e: PilotError) -> PilotError {
        if e.is_timeout() {
            self.state = LocatorState::TimedOut;
        }
        e
    }
}
