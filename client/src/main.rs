// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Command-line client for the Fake News Detection API
//!
//! Usage:
//!   fakenews analyze "Some news article text" --model rf
//!   fakenews stats --format json
//!   fakenews interactive

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fakenews_client::driver::Driver;
use fakenews_client::projector::{project_distribution, project_recent_confidence};
use fakenews_client::render::{render_charts, render_result, render_state};
use fakenews_client::{ClassificationService, ClientConfig, HttpClassificationService, ModelChoice, SubmissionPhase};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fakenews")]
#[command(about = "Classify news text as fake or real and browse prediction statistics")]
#[command(version)]
struct Args {
    /// Base address of the classification service [env: FAKENEWS_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds [env: FAKENEWS_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a piece of text (read from stdin when omitted)
    Analyze {
        text: Option<String>,

        /// Model to use (lr, rf, knn)
        #[arg(short, long, default_value = "rf")]
        model: ModelChoice,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Show every feature the service reports
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show aggregate statistics and charts
    Stats {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check service health
    Health,

    /// Show the service's endpoint listing
    Info,

    /// Line-based session: type text to analyze, `:help` for commands
    Interactive {
        /// Initial model (lr, rf, knn)
        #[arg(short, long, default_value = "rf")]
        model: ModelChoice,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the interactive screen free of info-level chatter
    let default_filter = match args.command {
        Command::Interactive { .. } => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()
        .context("Failed to read configuration from environment")?
        .with_overrides(args.api_url, args.timeout);
    let service = HttpClassificationService::new(config.clone()).context("Invalid client configuration")?;

    tracing::debug!("Using service at {}", config.base_url);

    match args.command {
        Command::Analyze {
            text,
            model,
            format,
            verbose,
        } => analyze(service, &config, text, model, format, verbose),
        Command::Stats { format } => stats(&service, format),
        Command::Health => health(&service),
        Command::Info => info(&service),
        Command::Interactive { model } => interactive(service, &config, model),
    }
}

/// Upper bound for waiting on a prediction plus its stats refresh
fn settle_timeout(config: &ClientConfig) -> Duration {
    config
        .timeout()
        .saturating_mul(2)
        .saturating_add(Duration::from_secs(1))
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn analyze(
    service: HttpClassificationService,
    config: &ClientConfig,
    text: Option<String>,
    model: ModelChoice,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            buf
        }
    };

    let mut driver = Driver::new(Arc::new(service), model);
    driver.set_text(text);
    if let Err(e) = driver.submit() {
        bail!("{}", e);
    }

    let pb = spinner("Analyzing...");
    let settled = driver.wait_idle(settle_timeout(config));
    pb.finish_and_clear();

    let session = driver.session();
    let state = session.state();

    match session.phase() {
        SubmissionPhase::Success => {}
        SubmissionPhase::Failed => bail!("{}", state.error_message),
        other => bail!("No response from the service (state: {:?}, settled: {})", other, settled),
    }

    let Some(ref result) = state.result else {
        bail!("Service reported success without a result");
    };

    match format {
        OutputFormat::Json => {
            let envelope = serde_json::json!({
                "analyzed_at": chrono::Utc::now().to_rfc3339(),
                "model_choice": model.code(),
                "result": result,
                "stats": state.stats,
            });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => {
            print!("{}", render_result(result, verbose));
            match render_charts(state.stats.as_ref()) {
                Ok(Some(charts)) => print!("\n{}", charts),
                Ok(None) => {}
                Err(e) => tracing::warn!("Cannot chart statistics: {}", e),
            }
        }
    }

    Ok(())
}

fn stats(service: &HttpClassificationService, format: OutputFormat) -> Result<()> {
    let stats = service.stats().context("Failed to fetch statistics")?;

    match format {
        OutputFormat::Json => {
            let distribution = project_distribution(Some(&stats));
            let recent = project_recent_confidence(Some(&stats))?;
            let envelope = serde_json::json!({
                "fetched_at": chrono::Utc::now().to_rfc3339(),
                "stats": stats,
                "charts": {
                    "distribution": distribution,
                    "recent_confidence": recent,
                },
            });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => match render_charts(Some(&stats))? {
            Some(charts) => print!("{}", charts),
            None => println!("No predictions yet."),
        },
    }

    Ok(())
}

fn health(service: &HttpClassificationService) -> Result<()> {
    let health = service.health().context("Health check failed")?;
    println!("Status: {}", health.status);
    println!("Models loaded: {}", health.models_loaded);
    println!("Checked at: {}", health.timestamp);

    if health.status != "healthy" {
        bail!("Service reports status '{}'", health.status);
    }
    Ok(())
}

fn info(service: &HttpClassificationService) -> Result<()> {
    let info = service.info().context("Failed to fetch service info")?;
    println!("{} (v{})", info.message, info.version);
    println!("{:-<60}", "");
    for (path, description) in &info.endpoints {
        println!("{:<12} {}", path, description);
    }
    Ok(())
}

const INTERACTIVE_HELP: &str = "\
Type or paste text and press Enter to analyze it.
Commands:
  :model <lr|rf|knn>   switch model
  :models              list models
  :clear               clear text, result and error
  :stats               refresh statistics
  :help                show this help
  :quit                exit";

fn interactive(service: HttpClassificationService, config: &ClientConfig, model: ModelChoice) -> Result<()> {
    let mut driver = Driver::new(Arc::new(service), model);

    println!("Fake News Detector");
    println!("Analyze news articles using AI-powered detection");
    println!("{}\n", INTERACTIVE_HELP);

    driver.refresh_stats();
    driver.wait_idle(config.timeout());
    print!("{}", render_state(driver.session().state()));

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let input = line.trim();

        match input.split_once(' ').map_or((input, ""), |(cmd, rest)| (cmd, rest.trim())) {
            (":quit" | ":q" | ":exit", _) => break,
            (":help", _) => {
                println!("{}", INTERACTIVE_HELP);
                continue;
            }
            (":models", _) => {
                for m in ModelChoice::ALL {
                    let marker = if m == driver.session().state().model_choice { "*" } else { " " };
                    println!("{} {:<4} {}", marker, m.code(), m.display_name());
                }
                continue;
            }
            (":model", choice) => match choice.parse::<ModelChoice>() {
                Ok(m) => driver.set_model(m),
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            },
            (":clear", _) => {
                driver.clear();
                driver.wait_idle(config.timeout());
            }
            (":stats", _) => {
                driver.refresh_stats();
                driver.wait_idle(config.timeout());
            }
            (cmd, _) if cmd.starts_with(':') => {
                println!("Unknown command '{}'. Type :help for commands.", cmd);
                continue;
            }
            _ => {
                driver.set_text(line.as_str());
                if driver.submit().is_ok() {
                    let pb = spinner("Analyzing...");
                    driver.wait_idle(settle_timeout(config));
                    pb.finish_and_clear();
                }
            }
        }

        driver.pump();
        print!("{}", render_state(driver.session().state()));
    }

    Ok(())
}
