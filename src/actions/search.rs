use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::actions::args::ActionArgs;
use crate::actions::dispatcher::ActionHandler;
use crate::driver::session::AppSession;
use crate::error::PilotResult;
use crate::locator::search_surface::SearchSurfaceLocator;

/// Everything up to the first code fence or punctuation mark.
static TERM_CUTOFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(.*?)(\s*```|[~!@#$%^&*(){}\[\];:'",.<>?/\\|]|$)"#)
        .expect("search term pattern is valid")
});

pub struct SearchAction;

/// Search term from the first argument value, cut at punctuation.
pub fn extract_search_term(args: &ActionArgs) -> Option<String> {
    let (_, value) = args.first()?;
    let term = match TERM_CUTOFF.captures(value).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => value.trim(),
    };
    Some(term.to_string())
}

/// `query` verbatim, else the extracted term.
pub fn search_term(args: &ActionArgs) -> Option<String> {
    match args.get("query") {
        Some(query) => Some(query.to_string()),
        None => extract_search_term(args),
    }
}

impl ActionHandler for SearchAction {
    fn execute(&self, session: &mut AppSession, args: &ActionArgs) -> PilotResult<bool> {
        let settings = session.settings.locator;
        let mut locator = SearchSurfaceLocator::new(session.driver(), settings);

        let Some(surface_id) = locator.locate(settings.label_timeout) else {
            warn!(state = ?locator.state(), "unable to detect search surface id");
            return Ok(false);
        };

        let term = search_term(args).unwrap_or_default();
        if term.is_empty() {
            warn!("no valid search term found in action arguments");
            return Ok(false);
        }

        info!(term = %term, surface = %surface_id, "searching");
        Ok(locator.search(&term, &surface_id))
    }
}
