mod common;

use common::scripted::{ScriptedCompletion, scripted_parser};
use mobile_pilot::actions::catalog::{ActionKind, catalog_listing};
use mobile_pilot::error::PilotError;
use mobile_pilot::llm::completion::{CompletionBackend, CompletionRequest, MockCompletionBackend};
use mobile_pilot::llm::instruction::{
    InstructionParser, build_prompt, parse_action_response, resolve_response,
};

// ============================================================================
// Response parsing
// ============================================================================

#[test]
fn parses_action_and_parameters() {
    let (name, args) =
        parse_action_response("Action: search\nParameters: query=chocolates, limit=5").unwrap();
    assert_eq!(name, "search");
    assert_eq!(args.get("query"), Some("chocolates"));
    assert_eq!(args.get("limit"), Some("5"));
    let keys: Vec<_> = args.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["query", "limit"]);
}

#[test]
fn labels_are_case_insensitive_and_lines_trimmed() {
    let raw = "\n   ACTION:   Open_App  \n\n  parameters:  \n";
    let (name, args) = parse_action_response(raw).unwrap();
    assert_eq!(name, "Open_App");
    assert!(args.is_empty());
}

#[test]
fn missing_parameters_line_gives_empty_args() {
    let (name, args) = parse_action_response("Action: take_screenshot").unwrap();
    assert_eq!(name, "take_screenshot");
    assert!(args.is_empty());
}

#[test]
fn fragments_without_equals_are_ignored() {
    let (_, args) =
        parse_action_response("Action: search\nParameters: chocolates, query = dark chocolate ")
            .unwrap();
    assert_eq!(args.len(), 1);
    assert_eq!(args.get("query"), Some("dark chocolate"));
}

#[test]
fn value_keeps_everything_after_first_equals() {
    let (_, args) = parse_action_response("Action: search\nParameters: query=a=b").unwrap();
    assert_eq!(args.get("query"), Some("a=b"));
}

#[test]
fn duplicate_keys_keep_first_position_and_last_value() {
    let (_, args) =
        parse_action_response("Action: search\nParameters: query=one, timeout=2, query=two")
            .unwrap();
    let pairs: Vec<_> = args.iter().collect();
    assert_eq!(pairs, vec![("query", "two"), ("timeout", "2")]);
}

#[test]
fn only_first_action_line_counts() {
    let (name, _) = parse_action_response("Action: search\nAction: open_app").unwrap();
    assert_eq!(name, "search");
}

#[test]
fn missing_action_line_is_a_format_error() {
    let err = parse_action_response("I think you should search.\nParameters: q=x").unwrap_err();
    assert!(matches!(err, PilotError::ResponseFormat(_)));
}

#[test]
fn unknown_action_is_distinct_from_format_error() {
    let err = resolve_response("Action: swipe_left\nParameters: speed=fast").unwrap_err();
    match err {
        PilotError::UnknownAction { name, available } => {
            assert_eq!(name, "swipe_left");
            assert_eq!(
                available,
                vec!["open_app", "wait_for_screen", "take_screenshot", "search"]
            );
        }
        other => panic!("expected UnknownAction, got {other:?}"),
    }
}

#[test]
fn resolved_name_is_lowercased_catalog_name() {
    let action = resolve_response("Action: WAIT_FOR_SCREEN\nParameters: timeout=3").unwrap();
    assert_eq!(action.name, "wait_for_screen");
    assert_eq!(action.kind(), Some(ActionKind::WaitForScreen));
    assert_eq!(action.arguments.get("timeout"), Some("3"));
}

// ============================================================================
// Prompt and request
// ============================================================================

#[test]
fn catalog_listing_names_every_action() {
    let listing = catalog_listing();
    assert_eq!(listing.lines().count(), ActionKind::ALL.len());
    assert!(listing.contains("- search: Performs a search using the search bar"));
    assert!(listing.contains("- open_app: Opens a specified application"));
}

#[test]
fn prompt_embeds_catalog_instruction_and_format() {
    let prompt = build_prompt("  Open the app ");
    assert!(prompt.contains(&catalog_listing()));
    assert!(prompt.contains("Instruction: Open the app\n"));
    assert!(prompt.contains("Action: <action_name>"));
    assert!(prompt.contains("Parameters: <param1>=<value1>, <param2>=<value2>"));
}

#[test]
fn request_uses_zero_temperature_and_token_limit() {
    let (parser, requests) = scripted_parser(["Action: open_app"]);
    let parser = parser.with_max_tokens(64);
    parser.interpret("Open the app").unwrap();

    let sent = requests.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].model, "test-model");
    assert_eq!(sent[0].max_tokens, 64);
    assert_eq!(sent[0].temperature, 0.0);
    assert!(sent[0].prompt.contains("Instruction: Open the app"));
}

#[test]
fn default_token_limit_is_150() {
    let parser = InstructionParser::new(Box::new(MockCompletionBackend), "m");
    assert_eq!(parser.request_for("x").max_tokens, 150);
}

// ============================================================================
// interpret / try_interpret
// ============================================================================

#[test]
fn interpret_returns_parsed_action() {
    let (parser, _) = scripted_parser(["Action: search\nParameters: query=Chocolates"]);
    let action = parser.interpret("Search for 'Chocolates'").unwrap();
    assert_eq!(action.name, "search");
    assert_eq!(action.arguments.get("query"), Some("Chocolates"));
}

#[test]
fn interpret_swallows_every_failure() {
    let backend = ScriptedCompletion::from_results([
        Err("503 Service Unavailable".to_string()),
        Ok("no directive here".to_string()),
        Ok("Action: fly".to_string()),
    ]);
    let parser = InstructionParser::new(Box::new(backend), "m");

    assert!(parser.interpret("one").is_none());
    assert!(parser.interpret("two").is_none());
    assert!(parser.interpret("three").is_none());
}

#[test]
fn try_interpret_surfaces_endpoint_errors() {
    let backend = ScriptedCompletion::from_results([Err("boom".to_string())]);
    let parser = InstructionParser::new(Box::new(backend), "m");
    assert!(matches!(
        parser.try_interpret("x"),
        Err(PilotError::Completion(_))
    ));
}

// ============================================================================
// Mock backend
// ============================================================================

fn mock_request(instruction: &str) -> CompletionRequest {
    InstructionParser::new(Box::new(MockCompletionBackend), "mock").request_for(instruction)
}

#[test]
fn mock_backend_covers_the_catalog() {
    let cases = [
        ("Open the app", "open_app"),
        ("Wait for the home screen to load", "wait_for_screen"),
        ("Take a screenshot", "take_screenshot"),
        ("Search for 'Chocolates'", "search"),
    ];
    for (instruction, expected) in cases {
        let raw = MockCompletionBackend.complete(&mock_request(instruction)).unwrap();
        let action = resolve_response(&raw).unwrap();
        assert_eq!(action.name, expected, "instruction: {instruction}");
    }
}

#[test]
fn mock_backend_extracts_quoted_query() {
    let raw = MockCompletionBackend
        .complete(&mock_request("Search for 'Chocolates'"))
        .unwrap();
    let action = resolve_response(&raw).unwrap();
    assert_eq!(action.arguments.get("query"), Some("Chocolates"));
}

#[test]
fn mock_backend_query_with_comma_stays_one_parameter() {
    let raw = MockCompletionBackend::respond("Search for 'milk, bread'");
    let (name, arguments) = parse_action_response(&raw).unwrap();
    assert_eq!(name, "search");
    assert_eq!(arguments.len(), 1);
    assert_eq!(arguments.get("query"), Some("milk bread"));
}
