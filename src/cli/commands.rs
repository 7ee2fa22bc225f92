use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::cli::config::{
    AppConfig, Cli, Environment, LlmSettings, build_adb_settings, build_driver_settings,
    build_llm_settings, build_session_settings, resolve_devices,
};
use crate::device::adb::{Adb, SystemRunner};
use crate::driver::session::AppSession;
use crate::error::PilotError;
use crate::llm::completion::{CompletionBackend, MockCompletionBackend, OpenAiCompletionBackend};
use crate::llm::instruction::InstructionParser;
use crate::report::console::{format_console_report, format_run_progress};
use crate::report::junit::generate_junit_xml;
use crate::report::report_model::SuiteReport;
use crate::screen::scanner::scan_document;
use crate::script::runner::ScriptRunner;
use crate::script::script_model::InstructionScript;

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub script: Option<String>,
    pub instructions: Vec<String>,
    pub app: Option<String>,
    pub devices: Vec<String>,
    pub format: Option<String>,
    pub output: Option<String>,
    pub backend: Option<String>,
}

// ============================================================================
// run subcommand
// ============================================================================

/// Run scripts on every selected device and return whether all passed.
pub fn cmd_run(
    cli: &Cli,
    args: &RunArgs,
    config: &AppConfig,
    env: &Environment,
) -> Result<bool, Box<dyn std::error::Error>> {
    let scripts = collect_scripts(args)?;
    if scripts.is_empty() {
        eprintln!("No instruction scripts found");
        return Ok(true);
    }

    let devices = resolve_devices(&args.devices, &config.device);
    if devices.is_empty() {
        return Err(PilotError::Config(
            "no device serial given; pass --device or set device.serials".into(),
        )
        .into());
    }

    let llm = build_llm_settings(cli, args.backend.as_deref(), config, env);
    let parser = build_parser(&llm)?;
    let driver_settings = build_driver_settings(cli, config, env);
    let session_settings = build_session_settings(config);
    let adb = Adb::new(SystemRunner, &build_adb_settings(&config.device));
    let runner = ScriptRunner::new(&parser, Duration::from_millis(config.run.step_delay_ms));

    info!(
        scripts = scripts.len(),
        devices = devices.len(),
        driver = %driver_settings.url,
        model = %llm.model,
        "starting run"
    );

    let start = Instant::now();
    let mut runs = Vec::new();
    for script in &scripts {
        for device_id in &devices {
            if cli.verbose > 0 {
                eprintln!("  Running: {} on {}", script.name, device_id);
            }
            let run = runner.run_on_device(&adb, device_id, script, |device, target| {
                let version = Some(device.platform_version.as_str()).filter(|v| !v.is_empty());
                AppSession::connect(
                    &driver_settings,
                    &device.device_id,
                    version,
                    target,
                    session_settings.clone(),
                )
            });
            if cli.verbose > 0 {
                eprint!("{}", format_run_progress(&run));
            }
            runs.push(run);
        }
    }

    let suite_name = args
        .script
        .as_deref()
        .unwrap_or("inline instructions")
        .to_string();
    let report = SuiteReport::from_runs(&suite_name, runs).with_duration(start.elapsed().as_millis());
    let all_passed = report.all_passed();

    let format = args.format.as_deref().unwrap_or(&config.run.format);
    let output_content = match format {
        "junit" => generate_junit_xml(&report),
        _ => format_console_report(&report),
    };

    match args.output.as_deref().or(config.run.output.as_deref()) {
        Some(path) => std::fs::write(path, &output_content)?,
        None => print!("{}", output_content),
    }

    Ok(all_passed)
}

/// Scripts from `--script`, else one inline script from `--instruction`s.
pub fn collect_scripts(args: &RunArgs) -> Result<Vec<InstructionScript>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.script {
        return load_scripts(path);
    }
    if args.instructions.is_empty() {
        return Err(PilotError::Config("pass --script or at least one --instruction".into()).into());
    }
    let app = args
        .app
        .as_deref()
        .ok_or_else(|| PilotError::Config("--app is required with --instruction".into()))?;
    Ok(vec![InstructionScript::from_lines("inline", app, &args.instructions)])
}

/// Load scripts from a single YAML file or a directory of YAML files.
pub fn load_scripts(path: &str) -> Result<Vec<InstructionScript>, Box<dyn std::error::Error>> {
    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        let mut scripts = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let p = entry?.path();
            if p.extension().is_some_and(|e| e == "yaml" || e == "yml") {
                scripts.push(read_script(&p)?);
            }
        }
        // Sort by name for deterministic order
        scripts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scripts)
    } else {
        Ok(vec![read_script(Path::new(path))?])
    }
}

fn read_script(path: &Path) -> Result<InstructionScript, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

// ============================================================================
// interpret subcommand
// ============================================================================

/// Print the resolved action for each instruction as one JSON line.
/// Returns whether every instruction resolved.
pub fn cmd_interpret(
    instructions: &[String],
    llm: &LlmSettings,
) -> Result<bool, Box<dyn std::error::Error>> {
    let parser = build_parser(llm)?;
    let mut all_resolved = true;

    for instruction in instructions {
        match parser.try_interpret(instruction) {
            Ok(action) => {
                let line = serde_json::json!({ "instruction": instruction, "action": action });
                println!("{}", line);
            }
            Err(e) => {
                all_resolved = false;
                let line = serde_json::json!({ "instruction": instruction, "error": e.to_string() });
                println!("{}", line);
            }
        }
    }

    Ok(all_resolved)
}

// ============================================================================
// scan subcommand
// ============================================================================

/// Print ranked search candidates from a saved page source.
pub fn cmd_scan(file: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let xml = std::fs::read_to_string(file)?;
    let candidates = scan_document(&xml)?;

    if candidates.is_empty() {
        println!("No search candidates found");
        return Ok(false);
    }

    println!("Found {} search candidates:", candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        let marker = if c.is_resource_match { "id" } else { "--" };
        println!(
            "  {:>2}. [{}] {} resource-id={} {}",
            i + 1,
            marker,
            c.element,
            c.resource_id().unwrap_or("-"),
            c.path
        );
    }
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

/// Build the completion backend named by `llm.backend`.
pub fn build_backend(llm: &LlmSettings) -> Result<Box<dyn CompletionBackend>, PilotError> {
    match llm.backend.as_str() {
        "mock" => Ok(Box::new(MockCompletionBackend)),
        "openai" => Ok(Box::new(OpenAiCompletionBackend::new(
            &llm.base_url,
            llm.api_key.clone(),
            llm.request_timeout,
        )?)),
        other => Err(PilotError::Config(format!(
            "unknown completion backend '{}' (expected openai or mock)",
            other
        ))),
    }
}

pub fn build_parser(llm: &LlmSettings) -> Result<InstructionParser, PilotError> {
    let backend = build_backend(llm)?;
    Ok(InstructionParser::new(backend, &llm.model).with_max_tokens(llm.max_tokens))
}
