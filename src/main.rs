use std::io::{BufRead, Write};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use deep_researcher::{ConfigOverrides, ResearchEngine, ResearchError};

/// Iterative web research with a cited final report.
#[derive(Parser, Debug)]
#[command(name = "deep-researcher", version)]
struct Cli {
    /// Research topic. Read from stdin when omitted.
    topic: Option<String>,

    /// Maximum research iterations
    #[arg(long = "max-loops")]
    max_loops: Option<u32>,

    /// Chat model identifier
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Search snippets only, without full page content
    #[arg(long)]
    no_full_page: bool,

    /// Keep <think> blocks in model output
    #[arg(long)]
    keep_thinking: bool,

    /// Results requested per search
    #[arg(long)]
    max_results: Option<usize>,

    /// Print the terminal research state as JSON after the report
    #[arg(long)]
    dump_state: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            temperature: self.temperature,
            max_research_loops: self.max_loops,
            fetch_full_page: self.no_full_page.then_some(false),
            strip_thinking_tokens: self.keep_thinking.then_some(false),
            max_results: self.max_results,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let topic = match cli.topic.clone() {
        Some(topic) => topic,
        None => prompt_topic()?,
    };
    if topic.trim().is_empty() {
        anyhow::bail!("No topic entered");
    }

    let engine = ResearchEngine::from_env(cli.overrides())?;
    info!(
        max_loops = engine.config().max_research_loops,
        model = %engine.config().model,
        "Research engine initialized"
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling research");
            on_ctrl_c.cancel();
        }
    });

    match engine.run(&topic, &cancel).await {
        Ok(outcome) => {
            println!("{}", outcome.report);
            if cli.dump_state {
                println!("{}", serde_json::to_string_pretty(&outcome.state)?);
            }
            Ok(())
        }
        Err(ResearchError::Cancelled) => {
            error!("Research cancelled");
            std::process::exit(130);
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt_topic() -> anyhow::Result<String> {
    print!("Enter your research topic: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
