use tracing::info;

use crate::actions::args::ActionArgs;
use crate::actions::dispatcher::ActionHandler;
use crate::driver::session::AppSession;
use crate::error::PilotResult;

pub struct OpenAppAction;

impl ActionHandler for OpenAppAction {
    fn execute(&self, session: &mut AppSession, _args: &ActionArgs) -> PilotResult<bool> {
        let target = session.target.clone();
        let capability = session.driver().launch_capability();
        info!(package = %target.package, ?capability, "launching app");
        session.driver().launch_app(&target)?;
        Ok(true)
    }
}
