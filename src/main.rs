// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! EcoSort: AI Waste Sorting Assistant
//!
//! Classifies photos of household items into waste categories with disposal
//! guidance, using a local vision model. Version 2.5 - live camera polling
//! with a web upload surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use ecosort::camera::FrameDirCamera;
use ecosort::classifier::WasteClassifier;
use ecosort::config::AppConfig;
use ecosort::inference::OllamaEngine;
use ecosort::live::LiveSession;
use ecosort::web;
use ecosort::{EcosortError, Result};

/// EcoSort CLI - AI Waste Sorting Assistant
#[derive(Parser, Debug)]
#[command(name = "ecosort")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "2.5.0")]
#[command(about = "AI-powered waste sorting assistant", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "ecosort.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web upload UI and classification API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Classify a single image file
    Classify {
        /// Image file to classify
        path: PathBuf,

        /// Output format for the result
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Run the live polling loop against a frame directory
    Live {
        /// Directory of image frames standing in for the camera
        #[arg(short, long)]
        frames: PathBuf,

        /// Stop after this many forwarded results (default: until Ctrl+C)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show AI engine status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "ecosort.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("EcoSort v2.5.0 - AI Waste Sorting Assistant");
    }

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Serve { host, port }) => run_serve(config, host, port).await,
        Some(Commands::Classify { path, format }) => run_classify(config, path, &format).await,
        Some(Commands::Live { frames, limit }) => run_live(config, frames, limit).await,
        Some(Commands::Status) => run_status(config).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config).await,
        None => {
            // Default: serve the web UI
            run_serve(config, None, None).await
        }
    }
}

fn build_classifier(config: &AppConfig) -> Arc<WasteClassifier> {
    let engine = OllamaEngine::new(
        &config.engine.url,
        &config.engine.model,
        &config.engine.prompt,
        config.engine.timeout_secs,
    );
    Arc::new(WasteClassifier::new(Arc::new(engine)))
}

/// Serve the web surface
async fn run_serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    let classifier = build_classifier(&config);

    // The server comes up regardless; classification returns 503 until the
    // engine is reachable.
    if let Err(e) = classifier.init().await {
        warn!("Inference engine not ready yet: {}", e);
    }

    web::start_server(config, classifier).await
}

/// One-shot classification of an image file
async fn run_classify(config: AppConfig, path: PathBuf, format: &str) -> Result<()> {
    let classifier = build_classifier(&config);
    classifier.init().await?;

    let bytes = std::fs::read(&path)?;
    let result = classifier.classify_image(&bytes).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("{}: {} ({:.0}%)", path.display(), result.category, result.confidence * 100.0);
            println!("  Label: {}", result.label);
            println!("  Guidance: {}", result.disposal_instructions);
            if !result.reasoning.is_empty() {
                println!("  Reasoning: {}", result.reasoning);
            }
        }
    }

    Ok(())
}

/// Run a live session against a directory camera, printing results
async fn run_live(config: AppConfig, frames: PathBuf, limit: Option<usize>) -> Result<()> {
    let classifier = build_classifier(&config);
    classifier.init().await?;

    let camera = Arc::new(FrameDirCamera::new(frames));
    let (tx, mut rx) = mpsc::channel(8);

    let session = LiveSession::start(camera, classifier, config.live.to_options(), tx);
    info!("Live session {} active. Press Ctrl+C to stop.", session.id());

    let mut received = 0usize;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping session...");
                break;
            }
            result = rx.recv() => {
                match result {
                    Some(result) => {
                        println!(
                            "{} ({:.0}%): {}",
                            result.category,
                            result.confidence * 100.0,
                            result.disposal_instructions
                        );
                        received += 1;
                        if limit.is_some_and(|n| received >= n) {
                            break;
                        }
                    }
                    // Session ended on its own (terminal error)
                    None => break,
                }
            }
        }
    }

    let final_state = session.state();
    session.stop();
    session.join().await;

    if let Some(e) = session_error(final_state) {
        return Err(e);
    }

    info!("Live session ended after {} results", received);
    Ok(())
}

/// Map a terminal session state to the error surfaced on the CLI. The
/// message carries the actual cause (camera denial, inference outage, ...)
/// verbatim.
fn session_error(state: ecosort::live::LiveState) -> Option<EcosortError> {
    match state {
        ecosort::live::LiveState::Error(message) => Some(EcosortError::LiveSession(message)),
        _ => None,
    }
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    let engine = OllamaEngine::new(
        &config.engine.url,
        &config.engine.model,
        &config.engine.prompt,
        config.engine.timeout_secs,
    );

    println!("EcoSort v2.5.0 Status");
    println!("=====================");

    use ecosort::inference::InferenceEngine;
    match engine.health_check().await {
        Ok(()) => println!("Engine: Running"),
        Err(e) => println!("Engine: Error - {}", e),
    }

    match engine.list_models().await {
        Ok(models) => {
            println!("\nAvailable models:");
            for m in &models {
                let marker = if m.starts_with(config.engine.model.as_str()) {
                    "→"
                } else {
                    " "
                };
                println!("  {} {}", marker, m);
            }
        }
        Err(e) => println!("  Error listing models: {}", e),
    }

    println!("\nConfiguration:");
    println!("  Engine URL: {}", config.engine.url);
    println!("  Vision model: {}", config.engine.model);
    println!("  Poll interval: {}s", config.live.poll_interval_secs);
    println!("  Confidence threshold: {}", config.live.confidence_threshold);

    Ok(())
}

/// Run config commands
async fn run_config_command(
    config: AppConfig,
    action: ConfigCommands,
    config_path: &PathBuf,
) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Engine URL: {}", config.engine.url);
            println!("  Vision model: {}", config.engine.model);
            println!("  Web: {}:{}", config.web.host, config.web.port);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_keeps_failure_cause() {
        let err = session_error(ecosort::live::LiveState::Error(
            "Classification failed 3 times in a row".to_string(),
        ));
        match err {
            Some(EcosortError::LiveSession(message)) => {
                assert!(message.contains("Classification failed"));
            }
            other => panic!("Expected LiveSession error, got {:?}", other),
        }

        assert!(session_error(ecosort::live::LiveState::Stopped).is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["ecosort"]).unwrap();
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_classify_command() {
        let cli = Cli::try_parse_from(["ecosort", "classify", "/tmp/item.jpg", "--format", "json"])
            .unwrap();

        match cli.command {
            Some(Commands::Classify { path, format }) => {
                assert_eq!(path, PathBuf::from("/tmp/item.jpg"));
                assert_eq!(format, "json");
            }
            _ => panic!("Expected Classify command"),
        }
    }

    #[test]
    fn test_cli_live_command() {
        let cli = Cli::try_parse_from(["ecosort", "live", "--frames", "/tmp/frames", "--limit", "5"])
            .unwrap();

        match cli.command {
            Some(Commands::Live { frames, limit }) => {
                assert_eq!(frames, PathBuf::from("/tmp/frames"));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("Expected Live command"),
        }
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::try_parse_from(["ecosort", "serve", "--port", "9090"]).unwrap();

        match cli.command {
            Some(Commands::Serve { port, .. }) => assert_eq!(port, Some(9090)),
            _ => panic!("Expected Serve command"),
        }
    }
}
