//! Terminal rendering for reports and progress.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::{AnalysisResult, AnalysisSession, Sentiment};
use crate::progress::{format_elapsed, phase_icon, ProgressStep};
use crate::report::{feature_scores, sentiment_distribution};

/// Progress bar for the Analyzing phase.
pub fn analysis_progress_bar(product_name: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}%")
            .unwrap()
            .progress_chars("█▓░"),
    );
    bar.set_message(format!("Analyzing {}", product_name));
    bar
}

/// Update the bar from the latest session state.
pub fn update_progress_bar(bar: &ProgressBar, session: &AnalysisSession) {
    let progress = session.progress.clamp(0, 100) as u64;
    bar.set_position(progress);

    let step = ProgressStep::from_progress(session.progress);
    let label = if session.current_phase_label.is_empty() {
        step.description().to_string()
    } else {
        session.current_phase_label.clone()
    };
    let elapsed = session
        .elapsed_secs(chrono::Utc::now())
        .map(|secs| format!(" • {}", format_elapsed(secs)))
        .unwrap_or_default();
    bar.set_message(format!(
        "{} {} — {}{}",
        phase_icon(&session.current_phase_label),
        step.title(),
        label,
        elapsed
    ));
}

fn sentiment_badge(sentiment: Sentiment) -> console::StyledObject<&'static str> {
    let label = sentiment.as_str();
    match sentiment {
        Sentiment::Positive => style(label).green(),
        Sentiment::Negative => style(label).red(),
        Sentiment::Mixed => style(label).yellow(),
        Sentiment::Neutral => style(label).dim(),
        Sentiment::Unknown => style(label).dim(),
    }
}

/// Print the full report: summary line, sentiment distribution, score
/// ranking, and per-feature verdicts.
pub fn print_report(product_name: &str, result: &AnalysisResult) {
    println!();
    println!(
        "{} {}",
        style("Analysis report for").bold(),
        style(product_name).bold().cyan()
    );
    println!(
        "  {} features analyzed from {} reviews",
        result.analysis.len(),
        result.total_reviews
    );

    let distribution = sentiment_distribution(result);
    if !distribution.is_empty() {
        println!();
        println!("{}", style("Sentiment distribution").bold());
        for slice in &distribution {
            println!(
                "  {:<10} {:>3}  {}",
                sentiment_badge(slice.sentiment),
                slice.count,
                "▇".repeat(slice.count.min(40))
            );
        }
    }

    let scores = feature_scores(result);
    if !scores.is_empty() {
        println!();
        println!("{}", style("Feature scores").bold());
        for entry in &scores {
            println!(
                "  {:>3}  {:<30} {}",
                entry.score,
                entry.feature,
                sentiment_badge(entry.sentiment)
            );
        }
    }

    for verdict in &result.analysis {
        println!();
        println!(
            "{} {} [{}]",
            style("●").cyan(),
            style(&verdict.feature).bold(),
            sentiment_badge(verdict.sentiment())
        );
        if !verdict.verdict.is_empty() {
            println!("  {}", verdict.verdict);
        }
        for point in &verdict.key_points {
            match point.count() {
                Some(count) => println!("    - {} ({} mentions)", point.text(), count),
                None => println!("    - {}", point.text()),
            }
        }
    }
    println!();
}

/// Print the numbered feature list with selection markers.
pub fn print_feature_list(session: &AnalysisSession) {
    println!();
    println!(
        "{} {}",
        style("Extracted features for").bold(),
        style(&session.product_name).cyan()
    );
    for (i, feature) in session.extracted_features.iter().enumerate() {
        let marker = if session.is_selected(feature) {
            style("[x]").green()
        } else {
            style("[ ]").dim()
        };
        println!("  {:>2}. {} {}", i + 1, marker, feature);
    }
}
