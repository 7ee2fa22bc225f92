use serde::Serialize;

use crate::actions::args::ActionArgs;

/// The closed set of actions an instruction can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    OpenApp,
    WaitForScreen,
    TakeScreenshot,
    Search,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::OpenApp,
        ActionKind::WaitForScreen,
        ActionKind::TakeScreenshot,
        ActionKind::Search,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::OpenApp => "open_app",
            ActionKind::WaitForScreen => "wait_for_screen",
            ActionKind::TakeScreenshot => "take_screenshot",
            ActionKind::Search => "search",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionKind::OpenApp => "Opens a specified application",
            ActionKind::WaitForScreen => "Waits for a specific screen to load",
            ActionKind::TakeScreenshot => "Takes a screenshot of the current screen",
            ActionKind::Search => "Performs a search using the search bar",
        }
    }

    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            ActionKind::Search => &["search_term"],
            _ => &[],
        }
    }

    /// Case-insensitive catalog lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.name()).collect()
    }
}

/// `- name: description` per catalog entry, one per line.
pub fn catalog_listing() -> String {
    ActionKind::ALL
        .iter()
        .map(|k| format!("- {}: {}", k.name(), k.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// An instruction resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedAction {
    /// Lowercased catalog name
    pub name: String,
    pub arguments: ActionArgs,
}

impl ParsedAction {
    pub fn new(name: impl Into<String>, arguments: ActionArgs) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::from_name(&self.name)
    }
}
