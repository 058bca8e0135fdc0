use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use eframe::egui;

use rusty_playground::data::encoder::LabelEncoding;
use rusty_playground::pipeline::{PipelineError, PipelineState, Ticket, Transition};
use rusty_playground::service::{
    EvaluateResponse, HttpService, ServiceError, SplitResponse, TableResponse, TrainResponse,
};
use rusty_playground::snapshot::ConfigBlob;

// ---------------------------------------------------------------------------
// Background service calls
// ---------------------------------------------------------------------------

/// A finished remote call, carrying the ticket it was issued with.
pub enum Outcome {
    Upload(Ticket, Result<TableResponse, ServiceError>),
    SelectFeatures(Ticket<Vec<String>>, Result<TableResponse, ServiceError>),
    Normalize(Ticket, Result<TableResponse, ServiceError>),
    Split(Ticket, Result<SplitResponse, ServiceError>),
    Train(Ticket<Option<LabelEncoding>>, Result<TrainResponse, ServiceError>),
    Evaluate(Ticket, Result<EvaluateResponse, ServiceError>),
    SaveConfig(Result<(), ServiceError>),
    LoadConfig(Ticket, Result<ConfigBlob, ServiceError>),
    /// The call's thread died before producing an answer.
    Crashed(Transition),
}

impl Outcome {
    pub fn transition(&self) -> Transition {
        match self {
            Outcome::Upload(..) => Transition::Upload,
            Outcome::SelectFeatures(..) => Transition::SelectFeatures,
            Outcome::Normalize(..) => Transition::Normalize,
            Outcome::Split(..) => Transition::Split,
            Outcome::Train(..) => Transition::Train,
            Outcome::Evaluate(..) => Transition::Evaluate,
            Outcome::SaveConfig(..) => Transition::SaveConfig,
            Outcome::LoadConfig(..) => Transition::LoadConfig,
            Outcome::Crashed(t) => *t,
        }
    }

    /// Feed the outcome back through the matching `complete_*` half.
    pub fn apply(self, state: &mut PipelineState) -> Result<Transition, PipelineError> {
        let transition = self.transition();
        match self {
            Outcome::Upload(t, r) => state.complete_upload(t, r),
            Outcome::SelectFeatures(t, r) => state.complete_select_features(t, r),
            Outcome::Normalize(t, r) => state.complete_normalize(t, r),
            Outcome::Split(t, r) => state.complete_split(t, r),
            Outcome::Train(t, r) => state.complete_train(t, r),
            Outcome::Evaluate(t, r) => state.complete_evaluate(t, r),
            Outcome::SaveConfig(r) => r.map_err(|source| PipelineError::Service { transition, source }),
            Outcome::LoadConfig(t, r) => state.complete_load_config(t, r),
            Outcome::Crashed(_) => Err(PipelineError::Service {
                transition,
                source: ServiceError::Transport("background call panicked".to_string()),
            }),
        }
        .map(|_| transition)
    }
}

/// Sends `Crashed` if the thread unwinds before the real outcome went out.
struct CrashGuard {
    tx: Sender<Outcome>,
    transition: Transition,
    ctx: egui::Context,
}

impl Drop for CrashGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("{} call panicked", self.transition);
            let _ = self.tx.send(Outcome::Crashed(self.transition));
        }
        self.ctx.request_repaint();
    }
}

/// Runs service calls on short-lived threads and hands results back over a
/// channel polled once per frame.
pub struct Worker {
    service: HttpService,
    tx: Sender<Outcome>,
    rx: Receiver<Outcome>,
    in_flight: usize,
}

impl Worker {
    pub fn new(service: HttpService) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            service,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn service_url(&self) -> &str {
        self.service.base_url()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Run `call` against the service off the UI thread. Exactly one outcome
    /// comes back per call.
    pub fn spawn<F>(&mut self, ctx: &egui::Context, transition: Transition, call: F)
    where
        F: FnOnce(&HttpService) -> Outcome + Send + 'static,
    {
        let service = self.service.clone();
        let guard = CrashGuard {
            tx: self.tx.clone(),
            transition,
            ctx: ctx.clone(),
        };
        self.in_flight += 1;
        thread::spawn(move || {
            let outcome = call(&service);
            // Receiver only goes away with the app.
            let _ = guard.tx.send(outcome);
        });
    }

    /// Drain every outcome that has arrived since the last frame.
    pub fn poll(&mut self) -> Vec<Outcome> {
        let outcomes: Vec<Outcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }
}
