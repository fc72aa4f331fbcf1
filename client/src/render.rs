// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Plain-text rendering surface for terminals

use crate::api::{AggregateStats, PredictionResult};
use crate::error::ProjectionError;
use crate::projector::{self, ColorKey};
use crate::session::UiState;
use std::fmt::Write;

const BAR_WIDTH: usize = 40;

/// Result card: verdict, confidence, model, then the feature grid
pub fn render_result(result: &PredictionResult, verbose: bool) -> String {
    let mut out = String::new();
    let features = &result.features;

    let _ = writeln!(out, "Analysis Results");
    let _ = writeln!(out, "{:-<50}", "");
    let _ = writeln!(out, "{}", result.prediction);
    let _ = writeln!(out, "Confidence: {:.1}%", result.confidence * 100.0);
    let _ = writeln!(out, "Model: {}", result.model_used);
    if let Some(ref timestamp) = result.timestamp {
        let _ = writeln!(out, "Analyzed at: {}", timestamp);
    }

    let _ = writeln!(out, "\nText Features");
    let _ = writeln!(out, "{:<20} {:>10}", "Word Count:", features.word_count);
    let _ = writeln!(out, "{:<20} {:>10}", "Character Count:", features.char_count);
    let _ = writeln!(out, "{:<20} {:>10.2}", "Avg Word Length:", features.avg_word_length);
    let _ = writeln!(out, "{:<20} {:>10}", "Exclamations:", features.exclamation_count);

    if verbose {
        for (name, value) in features.numeric_extras() {
            let label = format!("{}:", name.replace('_', " "));
            if value.fract() == 0.0 {
                let _ = writeln!(out, "{:<20} {:>10}", label, value);
            } else {
                let _ = writeln!(out, "{:<20} {:>10.3}", label, value);
            }
        }
    }

    out
}

/// Chart section, or `None` while there is nothing to chart
pub fn render_charts(stats: Option<&AggregateStats>) -> Result<Option<String>, ProjectionError> {
    if !projector::charts_visible(stats) {
        return Ok(None);
    }
    let Some(stats) = stats else {
        return Ok(None);
    };

    let mut out = String::new();

    if let Some(distribution) = projector::project_distribution(Some(stats)) {
        let _ = writeln!(out, "Prediction Distribution");
        let _ = writeln!(out, "{:-<50}", "");
        let percentages = distribution.percentages();
        for ((label, value), pct) in distribution.labels.iter().zip(distribution.values).zip(percentages) {
            let _ = writeln!(out, "{:<10} {} {:>4} ({:.1}%)", label.label(), bar(pct), value, pct);
        }
        let _ = writeln!(out, "Total Predictions: {}", stats.total_predictions);
        let _ = writeln!(out, "Average Confidence: {:.1}%", stats.average_confidence * 100.0);
    }

    if let Some(bars) = projector::project_recent_confidence(Some(stats))? {
        let _ = writeln!(out, "\nRecent Predictions Confidence");
        let _ = writeln!(out, "{:-<50}", "");
        for entry in bars {
            let _ = writeln!(
                out,
                "{:<8} {} {:>5.1}% {}",
                entry.label,
                bar(entry.value_percent),
                entry.value_percent,
                class_marker(entry.color)
            );
        }
    }

    Ok(Some(out))
}

/// Whole screen for the interactive session
pub fn render_state(state: &UiState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Model: {} ({})", state.model_choice, state.model_choice.code());
    if state.loading {
        let _ = writeln!(out, "Analyzing...");
    }
    if !state.error_message.is_empty() {
        let _ = writeln!(out, "Error: {}", state.error_message);
    }
    if let Some(ref result) = state.result {
        let _ = writeln!(out);
        out.push_str(&render_result(result, false));
    }

    match render_charts(state.stats.as_ref()) {
        Ok(Some(charts)) => {
            let _ = writeln!(out);
            out.push_str(&charts);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Cannot chart statistics: {}", e);
        }
    }

    out
}

fn bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn class_marker(color: ColorKey) -> &'static str {
    match color {
        ColorKey::Fake => "FAKE",
        ColorKey::Real => "REAL",
    }
}
