use clap::Parser;
use mobile_pilot::cli::commands::{RunArgs, cmd_interpret, cmd_run, cmd_scan};
use mobile_pilot::cli::config::{
    Cli, Commands, Environment, build_llm_settings, load_config, verbosity_filter,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());
    let env = Environment::from_env();

    let ok = match &cli.command {
        Commands::Run {
            script,
            instructions,
            app,
            devices,
            format,
            output,
            backend,
        } => {
            let args = RunArgs {
                script: script.clone(),
                instructions: instructions.clone(),
                app: app.clone(),
                devices: devices.clone(),
                format: format.clone(),
                output: output.clone(),
                backend: backend.clone(),
            };
            cmd_run(&cli, &args, &config, &env)?
        }
        Commands::Interpret {
            instructions,
            backend,
        } => {
            let llm = build_llm_settings(&cli, backend.as_deref(), &config, &env);
            cmd_interpret(instructions, &llm)?
        }
        Commands::Scan { file } => cmd_scan(file)?,
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}
