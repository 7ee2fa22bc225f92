use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PilotError, PilotResult};

/// Body of a legacy text-completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Anything that turns a prompt into completion text.
pub trait CompletionBackend {
    fn complete(&self, request: &CompletionRequest) -> PilotResult<String>;
}

// ============================================================================
// OpenAI-compatible Backend
// ============================================================================

pub struct OpenAiCompletionBackend {
    pub base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

impl OpenAiCompletionBackend {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> PilotResult<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/completions", self.base_url)
    }
}

impl CompletionBackend for OpenAiCompletionBackend {
    fn complete(&self, request: &CompletionRequest) -> PilotResult<String> {
        let mut call = self.client.post(self.endpoint()).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PilotError::Completion(format!("{}: {}", status, body)));
        }

        let text = response.text()?;
        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| PilotError::JsonParse {
                context: "completion response".into(),
                source: e,
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PilotError::Completion("response had no choices".into()))?;

        debug!(model = %request.model, chars = choice.text.len(), "completion received");
        Ok(choice.text.trim().to_string())
    }
}

// ============================================================================
// Mock Backend (for running without a completion endpoint)
// ============================================================================

/// Keyword heuristics over the prompt's `Instruction:` line.
pub struct MockCompletionBackend;

impl MockCompletionBackend {
    pub fn respond(instruction: &str) -> String {
        let lower = instruction.to_lowercase();

        if lower.contains("screenshot") {
            return "Action: take_screenshot\nParameters:".into();
        }
        if lower.contains("search") || lower.contains("look for") || lower.contains("find") {
            let query = quoted(instruction).unwrap_or_else(|| after_keyword(instruction));
            // Parameters are comma-separated
            let query = query.replace(',', "");
            return format!("Action: search\nParameters: query={}", query);
        }
        if lower.contains("wait") {
            return "Action: wait_for_screen\nParameters: timeout=5".into();
        }
        if lower.contains("open") || lower.contains("launch") || lower.contains("start") {
            return "Action: open_app\nParameters:".into();
        }

        "Action: none\nParameters:".into()
    }
}

impl CompletionBackend for MockCompletionBackend {
    fn complete(&self, request: &CompletionRequest) -> PilotResult<String> {
        let instruction = request
            .prompt
            .lines()
            .map(str::trim)
            .find_map(|l| l.strip_prefix("Instruction:"))
            .unwrap_or_default()
            .trim();
        Ok(Self::respond(instruction))
    }
}

/// Text between the first pair of double or single quotes.
fn quoted(text: &str) -> Option<String> {
    for quote in ['"', '\''] {
        let mut parts = text.splitn(3, quote);
        parts.next();
        if let (Some(inner), Some(_)) = (parts.next(), parts.next()) {
            if !inner.trim().is_empty() {
                return Some(inner.trim().to_string());
            }
        }
    }
    None
}

/// Words after "search for" / "search" / "find".
fn after_keyword(text: &str) -> String {
    let lower = text.to_lowercase();
    for keyword in ["search for ", "look for ", "search ", "find "] {
        if let Some(pos) = lower.find(keyword) {
            return text
                .get(pos + keyword.len()..)
                .unwrap_or_default()
                .trim()
                .to_string();
        }
    }
    String::new()
}
