use tracing::{debug, info, warn};

use crate::actions::args::ActionArgs;
use crate::actions::catalog::{ActionKind, ParsedAction, catalog_listing};
use crate::error::{PilotError, PilotResult};
use crate::llm::completion::{CompletionBackend, CompletionRequest};

pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Resolves free-text instructions into catalog actions.
pub struct InstructionParser {
    pub backend: Box<dyn CompletionBackend>,
    pub model: String,
    pub max_tokens: u32,
}

impl InstructionParser {
    pub fn new(backend: Box<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn request_for(&self, instruction: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt: build_prompt(instruction),
            max_tokens: self.max_tokens,
            temperature: 0.0,
        }
    }

    /// Resolve `instruction`, logging and swallowing any failure.
    pub fn interpret(&self, instruction: &str) -> Option<ParsedAction> {
        let raw = match self.backend.complete(&self.request_for(instruction)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(instruction, error = %e, "completion call failed");
                return None;
            }
        };

        match resolve_response(&raw) {
            Ok(action) => {
                info!(instruction, action = %action.name, args = action.arguments.len(), "instruction resolved");
                Some(action)
            }
            Err(e) => {
                warn!(instruction, response = %raw, error = %e, "error parsing completion response");
                None
            }
        }
    }

    pub fn try_interpret(&self, instruction: &str) -> PilotResult<ParsedAction> {
        let raw = self.backend.complete(&self.request_for(instruction))?;
        debug!(instruction, response = %raw, "completion response");
        resolve_response(&raw)
    }
}

pub fn build_prompt(instruction: &str) -> String {
    format!(
        r#"Interpret the following instruction and generate the corresponding action and parameters.
Available actions:
{}

Instruction: {}

Respond in the exact format:
Action: <action_name>
Parameters: <param1>=<value1>, <param2>=<value2>"#,
        catalog_listing(),
        instruction.trim()
    )
}

/// Parse and validate a completion response against the catalog.
pub fn resolve_response(raw: &str) -> PilotResult<ParsedAction> {
    let (name, arguments) = parse_action_response(raw)?;
    let kind = ActionKind::from_name(&name).ok_or_else(|| PilotError::UnknownAction {
        name: name.clone(),
        available: ActionKind::names(),
    })?;
    Ok(ParsedAction::new(kind.name(), arguments))
}

/// Split a response into its `Action:` name and `Parameters:` pairs.
///
/// Only the first line of each kind counts. Parameter fragments without
/// `=` are dropped.
pub fn parse_action_response(raw: &str) -> PilotResult<(String, ActionArgs)> {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let name = lines
        .iter()
        .find_map(|line| strip_label(line, "action:"))
        .ok_or_else(|| PilotError::ResponseFormat(raw.to_string()))?
        .to_string();

    let mut arguments = ActionArgs::new();
    if let Some(params) = lines.iter().find_map(|line| strip_label(line, "parameters:")) {
        for pair in params.split(',').map(str::trim) {
            if let Some((key, value)) = pair.split_once('=') {
                arguments.insert(key.trim(), value.trim());
            }
        }
    }

    Ok((name, arguments))
}

/// Remainder after `label` (ASCII case-insensitive), trimmed.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| line[label.len()..].trim())
}
