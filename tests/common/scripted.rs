use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use mobile_pilot::error::{PilotError, PilotResult};
use mobile_pilot::llm::completion::{CompletionBackend, CompletionRequest};
use mobile_pilot::llm::instruction::InstructionParser;

/// Completion backend that replays canned responses in order.
/// `Err` entries simulate endpoint failures.
pub struct ScriptedCompletion {
    responses: RefCell<VecDeque<Result<String, String>>>,
    requests: Rc<RefCell<Vec<CompletionRequest>>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Rc<RefCell<Vec<CompletionRequest>>> {
        Rc::clone(&self.requests)
    }
}

impl CompletionBackend for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> PilotResult<String> {
        self.requests.borrow_mut().push(request.clone());
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(PilotError::Completion(message)),
            None => Err(PilotError::Completion("no scripted response left".into())),
        }
    }
}

/// Parser over canned responses, plus the recorded requests.
pub fn scripted_parser<I, S>(responses: I) -> (InstructionParser, Rc<RefCell<Vec<CompletionRequest>>>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let backend = ScriptedCompletion::new(responses);
    let requests = backend.requests();
    (InstructionParser::new(Box::new(backend), "test-model"), requests)
}
