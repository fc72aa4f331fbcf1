// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Submission state machine
//!
//! `Session` is the single writer of `UiState`. It performs no I/O: `submit`
//! and `request_stats` hand out tickets describing the call to make, and the
//! caller reports each completion back with its ticket via `on_prediction` /
//! `on_stats`. Tickets carry the generation they were issued in, which is how
//! late responses are recognised and dropped.
//!
//! Staleness rules:
//! - a prediction response is ignored once a newer submission has started
//! - a prediction response that lands after `clear` only ends the loading
//!   state; result and error stay cleared
//! - a stats response is dropped if a clear or a newer submission happened
//!   after it was requested, or if a later-issued stats response was already
//!   applied
//!
//! A dropped refresh is replaced: `clear` always hands out a fresh stats
//! ticket, and a refresh dropped for a newer submission is re-issued once
//! that submission settles, unless a later ticket already covers it.

use crate::api::{AggregateStats, PredictionResult};
use crate::error::{StatsFetchError, TransportError, ValidationError};
use crate::projector;
use crate::request::{build_request, AnalysisRequest, ModelChoice};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Success,
    Failed,
}

/// Everything the rendering surface reads
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiState {
    pub text: String,
    pub model_choice: ModelChoice,
    pub result: Option<PredictionResult>,
    pub stats: Option<AggregateStats>,
    pub loading: bool,
    /// Empty when there is nothing to report
    pub error_message: String,
}

/// A classification call the caller must perform
#[derive(Debug, Clone, PartialEq)]
pub struct PredictTicket {
    pub id: u64,
    epoch: u64,
    pub request: AnalysisRequest,
}

/// A statistics refresh the caller must perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsTicket {
    pub id: u64,
    submission: u64,
    epoch: u64,
}

/// What became of a prediction response
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    /// Result stored; the ticket is the statistics refresh to perform next
    Applied(StatsTicket),
    /// Error message stored, previous result kept. Carries a statistics
    /// refresh when an earlier one was dropped while this call was in flight.
    Failed(Option<StatsTicket>),
    /// A newer submission owns the state; nothing changed
    Superseded,
    /// The user cleared while this was in flight; only `loading` was reset.
    /// Carries a refresh on the same terms as `Failed`.
    Cleared(Option<StatsTicket>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    Cleared,
    NewerSubmission,
    OutOfOrder,
}

/// What became of a statistics response
#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome {
    Applied,
    /// Too old to apply. `retry` is the replacement refresh to perform when
    /// nothing newer is already on its way.
    Discarded {
        reason: StaleReason,
        retry: Option<StatsTicket>,
    },
    /// Logged only; statistics are supplementary
    Failed,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: UiState,
    phase: SubmissionPhase,
    /// Id of the most recent submission (0 before the first)
    submission_seq: u64,
    /// Submission whose response is still awaited, if any
    active: Option<u64>,
    /// Bumped by every `clear`
    epoch: u64,
    stats_seq: u64,
    stats_applied: u64,
    /// A refresh was dropped while a submission was in flight and must be
    /// re-issued once that submission settles
    stats_owed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ModelChoice::default())
    }
}

impl Session {
    pub fn new(model_choice: ModelChoice) -> Self {
        Self {
            state: UiState {
                model_choice,
                ..UiState::default()
            },
            phase: SubmissionPhase::Idle,
            submission_seq: 0,
            active: None,
            epoch: 0,
            stats_seq: 0,
            stats_applied: 0,
            stats_owed: false,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// Whether a classification response is still awaited
    pub fn in_flight(&self) -> bool {
        self.active.is_some()
    }

    pub fn charts_visible(&self) -> bool {
        projector::charts_visible(self.state.stats.as_ref())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.state.text = text.into();
    }

    pub fn set_model(&mut self, model_choice: ModelChoice) {
        self.state.model_choice = model_choice;
    }

    /// Validate the current text and start a submission.
    ///
    /// On validation failure the message is shown and nothing else changes.
    /// A submission started while another is in flight supersedes it.
    pub fn submit(&mut self) -> Result<PredictTicket, ValidationError> {
        let request = match build_request(&self.state.text, self.state.model_choice) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Submission rejected locally: {:?}", e);
                self.state.error_message = e.to_string();
                return Err(e);
            }
        };

        self.submission_seq += 1;
        if let Some(previous) = self.active.replace(self.submission_seq) {
            tracing::info!("Submission {} superseded by {}", previous, self.submission_seq);
        }

        self.phase = SubmissionPhase::Submitting;
        self.state.loading = true;
        self.state.error_message.clear();

        tracing::debug!("Submission {} started with model {}", self.submission_seq, request.model_choice.code());

        Ok(PredictTicket {
            id: self.submission_seq,
            epoch: self.epoch,
            request,
        })
    }

    /// Apply a classification response
    pub fn on_prediction(
        &mut self,
        ticket: &PredictTicket,
        outcome: Result<PredictionResult, TransportError>,
    ) -> PredictionOutcome {
        if self.active != Some(ticket.id) {
            tracing::debug!("Ignoring response for superseded submission {}", ticket.id);
            return PredictionOutcome::Superseded;
        }

        self.active = None;
        self.state.loading = false;

        if ticket.epoch != self.epoch {
            tracing::debug!("Ignoring response for submission {} cleared while in flight", ticket.id);
            self.phase = SubmissionPhase::Idle;
            return PredictionOutcome::Cleared(self.owed_stats());
        }

        match outcome {
            Ok(result) => {
                tracing::info!(
                    "Submission {}: {} ({:.1}%) via {}",
                    ticket.id,
                    result.prediction,
                    result.confidence * 100.0,
                    result.model_used
                );
                self.state.result = Some(result);
                self.state.error_message.clear();
                self.phase = SubmissionPhase::Success;
                PredictionOutcome::Applied(self.request_stats())
            }
            Err(e) => {
                tracing::warn!("Submission {} failed: {}", ticket.id, e);
                self.state.error_message = e.user_message();
                self.phase = SubmissionPhase::Failed;
                PredictionOutcome::Failed(self.owed_stats())
            }
        }
    }

    /// Issue a statistics refresh outside the success path (e.g. on startup)
    pub fn request_stats(&mut self) -> StatsTicket {
        self.stats_owed = false;
        self.stats_seq += 1;
        StatsTicket {
            id: self.stats_seq,
            submission: self.submission_seq,
            epoch: self.epoch,
        }
    }

    /// Apply a statistics response. Failures are logged and otherwise ignored.
    pub fn on_stats(
        &mut self,
        ticket: &StatsTicket,
        outcome: Result<AggregateStats, StatsFetchError>,
    ) -> StatsOutcome {
        let stats = match outcome {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("Error fetching stats: {}", e);
                return StatsOutcome::Failed;
            }
        };

        let stale = if ticket.epoch != self.epoch {
            Some(StaleReason::Cleared)
        } else if ticket.submission != self.submission_seq {
            Some(StaleReason::NewerSubmission)
        } else if ticket.id <= self.stats_applied {
            Some(StaleReason::OutOfOrder)
        } else {
            None
        };

        if let Some(reason) = stale {
            tracing::debug!("Discarding stats response {}: {:?}", ticket.id, reason);
            let retry = if reason == StaleReason::OutOfOrder || ticket.id < self.stats_seq {
                None
            } else if self.active.is_some() {
                self.stats_owed = true;
                None
            } else {
                Some(self.request_stats())
            };
            return StatsOutcome::Discarded { reason, retry };
        }

        if !stats.consistent() {
            tracing::warn!(
                "Stats total {} does not match fake {} + real {}",
                stats.total_predictions,
                stats.fake_count,
                stats.real_count
            );
        }

        self.stats_applied = ticket.id;
        self.state.stats = Some(stats);
        StatsOutcome::Applied
    }

    /// Reset text, result and error. An in-flight submission keeps running
    /// (and keeps `loading` set) but its response will not repopulate state.
    ///
    /// Returns the statistics refresh that replaces any voided by the clear.
    pub fn clear(&mut self) -> StatsTicket {
        self.state.text.clear();
        self.state.result = None;
        self.state.error_message.clear();
        self.epoch += 1;

        if self.phase != SubmissionPhase::Submitting {
            self.phase = SubmissionPhase::Idle;
        }

        self.request_stats()
    }

    fn owed_stats(&mut self) -> Option<StatsTicket> {
        if self.stats_owed {
            Some(self.request_stats())
        } else {
            None
        }
    }
}
