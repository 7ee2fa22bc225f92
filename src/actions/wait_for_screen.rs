use std::time::Duration;

use tracing::{info, warn};

use crate::actions::args::ActionArgs;
use crate::actions::dispatcher::ActionHandler;
use crate::driver::driver_model::Locator;
use crate::driver::session::AppSession;
use crate::driver::wait::{Wait, first_present};
use crate::error::PilotResult;

pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_ELEMENT_ID: &str = "search_box";

pub struct WaitForScreenAction;

/// `timeout` argument in seconds; unparsable or negative values use the default.
pub fn timeout_from(args: &ActionArgs) -> Duration {
    args.get("timeout")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite() && *t >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
}

impl ActionHandler for WaitForScreenAction {
    fn execute(&self, session: &mut AppSession, args: &ActionArgs) -> PilotResult<bool> {
        let timeout = timeout_from(args);
        let element_id = args
            .get("element_id")
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_ELEMENT_ID)
            .to_string();

        let locator = Locator::id(&element_id);
        let poll = session.settings.locator.poll_interval;
        let result = Wait::new(timeout, poll).until(session.driver(), "screen element present", |d| {
            first_present(d, &locator)
        });

        match result {
            Ok(_) => {
                info!(element_id = %element_id, "screen ready");
                Ok(true)
            }
            Err(e) if e.is_timeout() => {
                warn!(element_id = %element_id, timeout_ms = timeout.as_millis() as u64, "screen did not load");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
