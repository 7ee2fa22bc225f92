use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::actions::args::ActionArgs;
use crate::actions::dispatcher::ActionHandler;
use crate::driver::session::AppSession;
use crate::error::PilotResult;

pub struct TakeScreenshotAction;

/// `<dir>/<local timestamp>.png`, with a filesystem-safe timestamp.
pub fn screenshot_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}.png", at.format("%Y-%m-%d_%H-%M-%S%.6f")))
}

/// `output_path` argument, else `<screenshot_root>/<package>`.
pub fn output_dir(session: &AppSession, args: &ActionArgs) -> PathBuf {
    match args.get("output_path").filter(|p| !p.trim().is_empty()) {
        Some(path) => PathBuf::from(path.trim()),
        None => session.settings.screenshot_root.join(&session.target.package),
    }
}

fn capture(session: &mut AppSession, args: &ActionArgs) -> PilotResult<PathBuf> {
    let dir = output_dir(session, args);
    fs::create_dir_all(&dir)?;
    let path = screenshot_path(&dir, Local::now());
    let png = session.driver().screenshot_png()?;
    fs::write(&path, png)?;
    Ok(path)
}

impl ActionHandler for TakeScreenshotAction {
    fn execute(&self, session: &mut AppSession, args: &ActionArgs) -> PilotResult<bool> {
        info!(device = %session.device_id, "taking screenshot");
        match capture(session, args) {
            Ok(path) => {
                info!(path = %path.display(), "screenshot saved");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "failed to take screenshot");
                Ok(false)
            }
        }
    }
}
