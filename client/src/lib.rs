// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Client workflow for the Fake News Detection API
//!
//! This crate provides:
//! - Input validation and request building for `/predict`
//! - A submission state machine guarding against stale responses
//! - Chart-ready projections of the `/stats` aggregate statistics
//! - An HTTP transport and a threaded event driver around the state machine
//! - A plain-text rendering surface

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod projector;
pub mod render;
pub mod request;
pub mod session;

pub use api::{AggregateStats, ClassificationService, HttpClassificationService, PredictionResult, TextFeatures, Verdict};
pub use config::ClientConfig;
pub use driver::Driver;
pub use error::{ConfigError, ProjectionError, StatsFetchError, TransportError, ValidationError};
pub use projector::{charts_visible, project_distribution, project_recent_confidence, ColorKey, ConfidenceBar, DistributionSeries};
pub use request::{build_request, AnalysisRequest, ModelChoice};
pub use session::{Session, SubmissionPhase, UiState};
