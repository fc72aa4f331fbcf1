// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Chart-ready projections of the aggregate statistics
//!
//! Two series are derived from a stats snapshot:
//! - Distribution (pie): fake vs real counts
//! - Recent confidence (bar): one bar per recent prediction, coloured by class
//!
//! Both are pure functions of the snapshot. Drawing is left to whichever
//! surface consumes them.

use crate::api::{AggregateStats, Verdict};
use crate::error::ProjectionError;
use serde::{Deserialize, Serialize};

/// Colour category of a bar or slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorKey {
    Fake,
    Real,
}

impl ColorKey {
    pub fn for_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::FakeNews => ColorKey::Fake,
            Verdict::RealNews => ColorKey::Real,
        }
    }

    pub fn fill_hex(&self) -> &'static str {
        match self {
            ColorKey::Fake => "#e74c3c",
            ColorKey::Real => "#2ecc71",
        }
    }

    pub fn border_hex(&self) -> &'static str {
        match self {
            ColorKey::Fake => "#c0392b",
            ColorKey::Real => "#27ae60",
        }
    }
}

/// Pie series: always exactly the two classes, fake first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSeries {
    pub labels: [Verdict; 2],
    pub values: [u64; 2],
}

impl DistributionSeries {
    pub fn total(&self) -> u64 {
        self.values[0].saturating_add(self.values[1])
    }

    /// Share of each slice in percent; zeros when there is nothing to share
    pub fn percentages(&self) -> [f64; 2] {
        let total = self.total();
        if total == 0 {
            return [0.0, 0.0];
        }
        self.values.map(|v| v as f64 * 100.0 / total as f64)
    }

    pub fn colors(&self) -> [ColorKey; 2] {
        self.labels.map(ColorKey::for_verdict)
    }
}

/// One bar of the recent-confidence chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBar {
    /// "Pred 1", "Pred 2", ... in snapshot order
    pub label: String,
    /// Confidence in percent, rounded to one decimal
    pub value_percent: f64,
    pub color: ColorKey,
}

pub fn project_distribution(stats: Option<&AggregateStats>) -> Option<DistributionSeries> {
    let stats = stats?;
    if !stats.consistent() {
        tracing::warn!(
            "Stats total {} does not match fake {} + real {}",
            stats.total_predictions,
            stats.fake_count,
            stats.real_count
        );
    }

    Some(DistributionSeries {
        labels: [Verdict::FakeNews, Verdict::RealNews],
        values: [stats.fake_count, stats.real_count],
    })
}

/// Bar series for the recent window. `Ok(None)` when there are no stats or no
/// recent predictions; an entry outside the two known classes fails the
/// whole projection.
pub fn project_recent_confidence(stats: Option<&AggregateStats>) -> Result<Option<Vec<ConfidenceBar>>, ProjectionError> {
    let Some(stats) = stats else {
        return Ok(None);
    };
    if stats.recent_predictions.is_empty() {
        return Ok(None);
    }

    let bars = stats
        .recent_predictions
        .iter()
        .enumerate()
        .map(|(idx, recent)| {
            let verdict = recent.verdict()?;
            Ok(ConfidenceBar {
                label: format!("Pred {}", idx + 1),
                value_percent: confidence_percent(recent.confidence),
                color: ColorKey::for_verdict(verdict),
            })
        })
        .collect::<Result<Vec<_>, ProjectionError>>()?;

    Ok(Some(bars))
}

/// Whether the chart section should be shown at all
pub fn charts_visible(stats: Option<&AggregateStats>) -> bool {
    stats.is_some_and(|s| s.total_predictions > 0)
}

/// `confidence * 100` rounded to one decimal, kept within [0, 100]
pub fn confidence_percent(confidence: f64) -> f64 {
    let clamped = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
    (clamped * 1000.0).round() / 10.0
}
