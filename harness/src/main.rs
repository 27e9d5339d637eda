use clap::{Parser, Subcommand};
use harness::config::{HarnessConfig, JudgeSettings};
use harness::present::{agent_failure, config_lines, console_line, debug_block};
use harness::{assemble, evaluate, AgentClient, Dashboard, Suite, TestInputs};
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Score a conversational agent's answers with LLM-judged metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent once and print every metric result
    Run {
        /// TOML file with question, expected_output and context
        #[arg(short, long)]
        case: Option<PathBuf>,
        /// Print the whole evaluation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive terminal dashboard
    Dashboard,
    /// Check that the judge backend is reachable
    Health,
    /// List models offered by the judge backend
    Models,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Commands::Run { case, json } => run(&HarnessConfig::from_env()?, case, json).await?,
        Commands::Dashboard => dashboard(&HarnessConfig::from_env()?).await?,
        Commands::Health => health_check(&JudgeSettings::from_env()?).await?,
        Commands::Models => list_models(&JudgeSettings::from_env()?).await?,
    }

    Ok(())
}

async fn run(
    config: &HarnessConfig,
    case: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = match case {
        Some(path) => TestInputs::from_toml_file(&path)?,
        None => TestInputs::script_defaults(),
    };

    if !json {
        println!("{}", config_lines(&config.agent));
    }

    let client = AgentClient::new(config.agent.clone());
    let answered = match assemble(&client, inputs).await {
        Ok(answered) => answered,
        Err(e) => {
            error!("Agent call failed: {}", e);
            println!("{}", agent_failure(&e, json));
            std::process::exit(1);
        }
    };

    let specs = Suite::Script.build(config.judge.judge()?);

    if !json {
        println!("\n{}\n", debug_block(&answered.record));
    }

    let evaluation = evaluate(answered, &specs).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    println!("📊 Evaluation Results:");
    for result in &evaluation.results {
        println!("{}", console_line(result));
    }

    Ok(())
}

async fn dashboard(config: &HarnessConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = AgentClient::new(config.agent.clone());
    let specs = Suite::Dashboard.build(config.judge.judge()?);

    let mut dashboard = Dashboard::new(&client, specs);
    dashboard.run(io::stdin().lock(), io::stdout()).await?;

    Ok(())
}

async fn list_models(settings: &JudgeSettings) -> Result<(), Box<dyn std::error::Error>> {
    let provider = settings.provider()?;

    println!("Available models ({}):", provider.provider_name());
    let models = provider.list_models().await?;

    if models.is_empty() {
        println!("  No models found.");
    } else {
        for model in models {
            println!(
                "  - {} ({})",
                model.name,
                model
                    .size
                    .map(|s| format!("{:.1} GB", s as f64 / 1_000_000_000.0))
                    .unwrap_or_else(|| "unknown size".to_string())
            );
        }
    }

    Ok(())
}

async fn health_check(settings: &JudgeSettings) -> Result<(), Box<dyn std::error::Error>> {
    println!("Performing health check...");
    let provider = settings.provider()?;

    match provider.health_check().await {
        Ok(()) => {
            println!(
                "✓ Health check passed. {} judge ({}) is reachable.",
                provider.provider_name(),
                settings.model()
            );
            info!("Health check successful");
        }
        Err(e) => {
            println!("✗ Health check failed: {}", e);
            error!("Health check failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
