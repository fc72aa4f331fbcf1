// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Input validation and classification request building

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum number of characters (after trimming) the service accepts
pub const MIN_TEXT_CHARS: usize = 10;

/// Pre-trained models offered by the classification service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelChoice {
    #[serde(rename = "lr")]
    LogisticRegression,
    #[default]
    #[serde(rename = "rf")]
    RandomForest,
    #[serde(rename = "knn")]
    KNearestNeighbors,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [
        ModelChoice::LogisticRegression,
        ModelChoice::RandomForest,
        ModelChoice::KNearestNeighbors,
    ];

    /// Wire code sent as `model_choice`
    pub fn code(&self) -> &'static str {
        match self {
            ModelChoice::LogisticRegression => "lr",
            ModelChoice::RandomForest => "rf",
            ModelChoice::KNearestNeighbors => "knn",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelChoice::LogisticRegression => "Logistic Regression",
            ModelChoice::RandomForest => "Random Forest",
            ModelChoice::KNearestNeighbors => "K-Nearest Neighbors",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelChoice {
    type Err = String;

    /// Accepts the wire code or the display name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ModelChoice::ALL
            .into_iter()
            .find(|m| m.code() == wanted || m.display_name().to_lowercase() == wanted)
            .ok_or_else(|| {
                let codes: Vec<_> = ModelChoice::ALL.iter().map(|m| m.code()).collect();
                format!("unknown model '{}'. Choose from: {}", s, codes.join(", "))
            })
    }
}

/// A validated request for `POST /predict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    pub model_choice: ModelChoice,
}

/// Validate raw input and build a request.
///
/// Length is measured on the trimmed text in characters; the text itself is
/// sent as typed and normalization is left to the service.
pub fn build_request(raw_text: &str, model_choice: ModelChoice) -> Result<AnalysisRequest, ValidationError> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if trimmed.chars().count() < MIN_TEXT_CHARS {
        return Err(ValidationError::TooShort);
    }

    Ok(AnalysisRequest {
        text: raw_text.to_string(),
        model_choice,
    })
}
