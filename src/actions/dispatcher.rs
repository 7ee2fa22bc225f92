use serde::Serialize;
use tracing::{info, warn};

use crate::actions::args::ActionArgs;
use crate::actions::catalog::{ActionKind, ParsedAction};
use crate::actions::open_app::OpenAppAction;
use crate::actions::search::SearchAction;
use crate::actions::take_screenshot::TakeScreenshotAction;
use crate::actions::wait_for_screen::WaitForScreenAction;
use crate::driver::session::AppSession;
use crate::error::PilotResult;

/// One catalog action run against a live session.
///
/// `Ok(false)` is a soft failure the handler already logged; `Err` means a
/// collaborator (driver, filesystem) is broken and the device run stops.
pub trait ActionHandler {
    fn execute(&self, session: &mut AppSession, args: &ActionArgs) -> PilotResult<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Completed { action: ActionKind },
    SoftFailure { action: ActionKind },
    /// Name outside the catalog; nothing ran
    Unhandled { name: String },
}

pub fn handler_for(kind: ActionKind) -> &'static dyn ActionHandler {
    match kind {
        ActionKind::OpenApp => &OpenAppAction,
        ActionKind::WaitForScreen => &WaitForScreenAction,
        ActionKind::TakeScreenshot => &TakeScreenshotAction,
        ActionKind::Search => &SearchAction,
    }
}

pub fn dispatch(session: &mut AppSession, action: &ParsedAction) -> PilotResult<DispatchOutcome> {
    let Some(kind) = ActionKind::from_name(&action.name.to_lowercase()) else {
        warn!(action = %action.name, "unhandled action");
        return Ok(DispatchOutcome::Unhandled {
            name: action.name.clone(),
        });
    };

    info!(action = kind.name(), device = %session.device_id, "executing action");
    let done = handler_for(kind).execute(session, &action.arguments)?;

    Ok(if done {
        DispatchOutcome::Completed { action: kind }
    } else {
        DispatchOutcome::SoftFailure { action: kind }
    })
}
