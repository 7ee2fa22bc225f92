use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::driver::driver_model::{ElementHandle, Locator, UiDriver};
use crate::error::{PilotError, PilotResult};

/// Bounded polling wait over a driver.
///
/// The condition is checked once before the first sleep, so a zero timeout
/// still gives the surface one chance to satisfy it.
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    timeout: Duration,
    poll_interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `condition` until it yields a value or the timeout elapses.
    ///
    /// Errors raised by the condition end the wait immediately.
    pub fn until<D, T, F>(&self, driver: &mut D, description: &str, mut condition: F) -> PilotResult<T>
    where
        D: UiDriver + ?Sized,
        F: FnMut(&mut D) -> PilotResult<Option<T>>,
    {
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            if let Some(value) = condition(&mut *driver)? {
                trace!(condition = description, polls, "wait satisfied");
                return Ok(value);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(PilotError::WaitTimeout {
                    condition: description.to_string(),
                    timeout_ms: self.timeout.as_millis(),
                });
            }

            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// First element matching `locator`, displayed or not.
pub fn first_present<D>(driver: &mut D, locator: &Locator) -> PilotResult<Option<ElementHandle>>
where
    D: UiDriver + ?Sized,
{
    Ok(driver.find_elements(locator)?.into_iter().next())
}

/// First element matching `locator`, if it is displayed.
///
/// An element that goes stale before the check counts as not visible yet.
pub fn first_visible<D>(driver: &mut D, locator: &Locator) -> PilotResult<Option<ElementHandle>>
where
    D: UiDriver + ?Sized,
{
    let Some(element) = first_present(driver, locator)? else {
        return Ok(None);
    };
    let displayed = driver.is_displayed(&element);
    Ok(not_gone(displayed, &element)?.then_some(element))
}

/// First element matching `locator`, if it is displayed and enabled.
pub fn first_clickable<D>(driver: &mut D, locator: &Locator) -> PilotResult<Option<ElementHandle>>
where
    D: UiDriver + ?Sized,
{
    let Some(element) = first_visible(driver, locator)? else {
        return Ok(None);
    };
    let enabled = driver.is_enabled(&element);
    Ok(not_gone(enabled, &element)?.then_some(element))
}

/// Map a vanished-element error to `false`; other errors pass through.
fn not_gone(check: PilotResult<bool>, element: &ElementHandle) -> PilotResult<bool> {
    match check {
        Err(e) if e.is_element_gone() => {
            trace!(element = element.id(), error = %e, "element went stale, polling again");
            Ok(false)
        }
        other => other,
    }
}
