//! CLI commands implementation.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use crate::client::{AnalysisBackend, ApiClient, ApiError};
use crate::config::{load_settings, Settings};
use crate::models::SessionPhase;
use crate::progress::{format_elapsed, ProgressStep};
use crate::session::AnalysisController;

use super::render;

#[derive(Parser)]
#[command(name = "revify")]
#[command(about = "Analyze product reviews with the Revify backend")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API base URL (overrides config)
    #[arg(long, global = true, env = "REVIFY_API_URL")]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a product: extract features, select, and poll to completion
    Analyze {
        /// Amazon product URL
        url: String,
        /// Product display name (derived from the URL if omitted)
        #[arg(short, long)]
        name: Option<String>,
        /// Comma-separated features to analyze (skips the selection prompt)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,
        /// Analyze all extracted features without prompting
        #[arg(short, long)]
        all: bool,
    },

    /// Show the current analysis status
    Status,

    /// Fetch and display the latest analysis report
    Results,

    /// Download an exported report file
    Download {
        /// Filename as referenced by the report
        filename: String,
        /// Output path (defaults to the filename in the download dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check backend connectivity
    Health,
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = &cli.api_url {
        settings.api_base_url = api_url.clone();
    }

    let client = Arc::new(ApiClient::new(
        &settings.api_base_url,
        settings.request_timeout(),
    ));

    match cli.command {
        Commands::Analyze {
            url,
            name,
            features,
            all,
        } => cmd_analyze(client, &settings, &url, name.as_deref(), &features, all).await,
        Commands::Status => cmd_status(client).await,
        Commands::Results => cmd_results(client).await,
        Commands::Download { filename, output } => {
            cmd_download(client, &settings, &filename, output).await
        }
        Commands::Health => cmd_health(client).await,
    }
}

async fn cmd_analyze(
    client: Arc<ApiClient>,
    settings: &Settings,
    url: &str,
    name: Option<&str>,
    features: &[String],
    all: bool,
) -> anyhow::Result<()> {
    let mut controller = AnalysisController::new(
        client,
        settings.poll_interval(),
        settings.completion_delay(),
    );

    println!("{} {}", style("Submitting").bold(), url);
    controller.submit(url, name).await?;

    render::print_feature_list(controller.session());

    if !features.is_empty() {
        apply_feature_selection(&mut controller, features)?;
    } else if !all && console::user_attended() {
        prompt_feature_selection(&mut controller)?;
    }

    let selected = controller.session().selected_features.len();
    println!(
        "Analyzing {} of {} features",
        selected,
        controller.session().extracted_features.len()
    );

    controller.confirm().await?;

    // Ctrl-C tears down the polling loop instead of killing the process,
    // so a response already in flight is discarded, not applied.
    let teardown = controller.teardown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            teardown.teardown();
        }
    });

    let bar = render::analysis_progress_bar(&controller.session().product_name);
    let final_phase = controller
        .poll_until_terminal(|session| render::update_progress_bar(&bar, session))
        .await;
    bar.finish_and_clear();

    match final_phase {
        SessionPhase::Completed => {
            let session = controller.session();
            if let Some(elapsed) = session.elapsed_secs(chrono::Utc::now()) {
                println!(
                    "{} in {}",
                    style("Analysis complete").green().bold(),
                    format_elapsed(elapsed)
                );
            } else {
                println!("{}", style("Analysis complete").green().bold());
            }
            if let Some(result) = &session.result {
                render::print_report(&session.product_name, result);
            }
            Ok(())
        }
        SessionPhase::Failed => {
            let message = controller
                .session()
                .error_message
                .clone()
                .unwrap_or_else(|| "Analysis failed".to_string());
            anyhow::bail!("{}", message);
        }
        _ => {
            println!("{}", style("Analysis cancelled").yellow());
            Ok(())
        }
    }
}

/// Narrow the selection to the named features. Unknown names fail fast
/// rather than silently analyzing the wrong thing.
fn apply_feature_selection(
    controller: &mut AnalysisController<ApiClient>,
    features: &[String],
) -> anyhow::Result<()> {
    let extracted = controller.session().extracted_features.clone();
    for wanted in features {
        if !extracted.iter().any(|f| f.eq_ignore_ascii_case(wanted)) {
            anyhow::bail!(
                "Unknown feature '{}' (extracted: {})",
                wanted,
                extracted.join(", ")
            );
        }
    }
    for feature in &extracted {
        let wanted = features.iter().any(|f| f.eq_ignore_ascii_case(feature));
        if controller.session().is_selected(feature) != wanted {
            controller.toggle_feature(feature);
        }
    }
    Ok(())
}

/// Interactive selection: toggle by number, `a` for all/none, empty to
/// continue, `q` to abandon the session.
fn prompt_feature_selection(
    controller: &mut AnalysisController<ApiClient>,
) -> anyhow::Result<()> {
    loop {
        print!(
            "{}",
            style("Toggle features by number, 'a' for all/none, Enter to continue, 'q' to quit: ")
                .dim()
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let input = line.trim();

        match input {
            "" => return Ok(()),
            "q" => {
                controller.back();
                anyhow::bail!("Selection abandoned");
            }
            "a" => controller.toggle_all(),
            _ => {
                for token in input.split([',', ' ']).filter(|t| !t.is_empty()) {
                    match token.parse::<usize>() {
                        Ok(n) if n >= 1 && n <= controller.session().extracted_features.len() => {
                            let feature = controller.session().extracted_features[n - 1].clone();
                            controller.toggle_feature(&feature);
                        }
                        _ => println!("{} {}", style("Ignoring:").yellow(), token),
                    }
                }
            }
        }
        render::print_feature_list(controller.session());
    }
}

async fn cmd_status(client: Arc<ApiClient>) -> anyhow::Result<()> {
    let snapshot = client.get_status().await?;

    if let Some(error) = &snapshot.error {
        println!("{} {}", style("Failed:").red().bold(), error);
        return Ok(());
    }
    if snapshot.is_running {
        let step = ProgressStep::from_progress(snapshot.progress);
        println!(
            "{} {}% — {} ({})",
            style("Running:").green().bold(),
            snapshot.progress,
            step.title(),
            snapshot.current_phase
        );
        if let Some(start) = snapshot.start_time {
            let elapsed = (chrono::Utc::now() - start).num_seconds().max(0);
            println!("  elapsed {}", format_elapsed(elapsed));
        }
    } else if snapshot.result.is_some() {
        println!("{}", style("Completed — results available").green().bold());
    } else {
        println!("{}", style("Idle — no analysis running").dim());
    }
    Ok(())
}

async fn cmd_results(client: Arc<ApiClient>) -> anyhow::Result<()> {
    let result = client.get_results().await?;
    render::print_report("latest analysis", &result);
    Ok(())
}

async fn cmd_download(
    client: Arc<ApiClient>,
    settings: &Settings,
    filename: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let bytes = client.download_file(filename).await?;
    let path = output.unwrap_or_else(|| settings.download_dir.join(filename));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&path, &bytes).await?;
    println!(
        "{} {} ({} bytes)",
        style("Saved").green().bold(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

async fn cmd_health(client: Arc<ApiClient>) -> anyhow::Result<()> {
    match client.health_check().await {
        Ok(()) => {
            println!("{}", style("API connected").green().bold());
            Ok(())
        }
        Err(err @ ApiError::Unreachable) => {
            println!("{}", style("API disconnected").red().bold());
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
