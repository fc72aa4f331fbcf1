// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Event loop around the submission state machine
//!
//! The driver owns the `Session` and is the only thread that touches it.
//! Service calls run on short-lived worker threads and report back over a
//! channel; completions are applied in arrival order whenever the owner
//! pumps or waits.

use crate::api::{AggregateStats, ClassificationService, PredictionResult};
use crate::error::{StatsFetchError, TransportError, ValidationError};
use crate::request::ModelChoice;
use crate::session::{PredictTicket, PredictionOutcome, Session, StatsOutcome, StatsTicket};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Completion of a service call, tagged with the ticket it answers
#[derive(Debug)]
pub enum ServiceEvent {
    Prediction {
        ticket: PredictTicket,
        outcome: Result<PredictionResult, TransportError>,
    },
    Stats {
        ticket: StatsTicket,
        outcome: Result<AggregateStats, StatsFetchError>,
    },
}

/// How an applied event changed things, for callers that want to react
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Prediction(PredictionOutcome),
    Stats(StatsOutcome),
}

pub struct Driver<S: ClassificationService + 'static> {
    session: Session,
    service: Arc<S>,
    tx: Sender<ServiceEvent>,
    rx: Receiver<ServiceEvent>,
    in_flight: usize,
}

impl<S: ClassificationService + 'static> Driver<S> {
    pub fn new(service: Arc<S>, model_choice: ModelChoice) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            session: Session::new(model_choice),
            service,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of service calls whose completion has not been applied yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.session.set_text(text);
    }

    pub fn set_model(&mut self, model_choice: ModelChoice) {
        self.session.set_model(model_choice);
    }

    /// Validate and dispatch the current text. Nothing is sent on a
    /// validation failure.
    pub fn submit(&mut self) -> Result<(), ValidationError> {
        let ticket = self.session.submit()?;
        self.dispatch_prediction(ticket);
        Ok(())
    }

    /// Reset the session and refetch statistics
    pub fn clear(&mut self) {
        let ticket = self.session.clear();
        self.dispatch_stats(ticket);
    }

    pub fn refresh_stats(&mut self) {
        let ticket = self.session.request_stats();
        self.dispatch_stats(ticket);
    }

    /// Apply every completion that has already arrived
    pub fn pump(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            applied.push(self.apply(event));
        }
        applied
    }

    /// Block for at most `timeout` waiting for one completion
    pub fn wait_for_event(&mut self, timeout: Duration) -> Option<Applied> {
        if self.in_flight == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.apply(event)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply completions until nothing is in flight or the deadline passes.
    /// Returns whether the driver went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        // No representable deadline means wait without one
        let deadline = Instant::now().checked_add(timeout);
        while self.in_flight > 0 {
            let remaining = deadline.map_or(timeout, |d| d.saturating_duration_since(Instant::now()));
            if remaining.is_zero() {
                tracing::warn!("{} service call(s) still pending after {:?}", self.in_flight, timeout);
                return false;
            }
            self.wait_for_event(remaining);
        }
        true
    }

    fn apply(&mut self, event: ServiceEvent) -> Applied {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            ServiceEvent::Prediction { ticket, outcome } => {
                let result = self.session.on_prediction(&ticket, outcome);
                match result {
                    PredictionOutcome::Applied(stats_ticket)
                    | PredictionOutcome::Failed(Some(stats_ticket))
                    | PredictionOutcome::Cleared(Some(stats_ticket)) => self.dispatch_stats(stats_ticket),
                    _ => {}
                }
                Applied::Prediction(result)
            }
            ServiceEvent::Stats { ticket, outcome } => {
                let result = self.session.on_stats(&ticket, outcome);
                if let StatsOutcome::Discarded { retry: Some(retry), .. } = result {
                    self.dispatch_stats(retry);
                }
                Applied::Stats(result)
            }
        }
    }

    fn dispatch_prediction(&mut self, ticket: PredictTicket) {
        self.in_flight += 1;
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let outcome = service.predict(&ticket.request);
            // Receiver gone means the driver was dropped; nothing left to update
            let _ = tx.send(ServiceEvent::Prediction { ticket, outcome });
        });
    }

    fn dispatch_stats(&mut self, ticket: StatsTicket) {
        self.in_flight += 1;
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let outcome = service.stats();
            let _ = tx.send(ServiceEvent::Stats { ticket, outcome });
        });
    }
}
