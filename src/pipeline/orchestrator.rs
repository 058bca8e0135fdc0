use crate::data::loader::UploadFile;
use crate::service::ProcessingService;
use crate::snapshot::ConfigBlob;

use super::error::PipelineError;
use super::state::PipelineState;
use super::transitions::Transition;

// ---------------------------------------------------------------------------
// Orchestrator – blocking driver around one session
// ---------------------------------------------------------------------------

/// Owns one session's state and runs each transition to completion against
/// a [`ProcessingService`]: begin, call, complete.
///
/// With a single owner nothing else can advance the state while a call is
/// outstanding. Callers that run calls off-thread drive the `begin_*` /
/// `complete_*` halves on [`PipelineState`] directly.
pub struct Orchestrator<S> {
    state: PipelineState,
    service: S,
}

impl<S: ProcessingService> Orchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            state: PipelineState::new(),
            service,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Local configuration edits (method, test size, model) go through here.
    pub fn state_mut(&mut self) -> &mut PipelineState {
        &mut self.state
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn upload(&mut self, file: &UploadFile) -> Result<(), PipelineError> {
        let ticket = self.state.begin_upload(file)?;
        let result = self.service.upload(file);
        self.state.complete_upload(ticket, result)
    }

    pub fn select_features(&mut self, columns: &[String]) -> Result<(), PipelineError> {
        let (ticket, request) = self.state.begin_select_features(columns)?;
        let result = self.service.select_features(&request);
        self.state.complete_select_features(ticket, result)
    }

    /// Normalize every selected column.
    pub fn normalize(&mut self) -> Result<(), PipelineError> {
        let columns = self.state.selected_columns().to_vec();
        self.normalize_columns(&columns)
    }

    pub fn normalize_columns(&mut self, columns: &[String]) -> Result<(), PipelineError> {
        let (ticket, request) = self.state.begin_normalize(columns)?;
        let result = self.service.normalize(&request);
        self.state.complete_normalize(ticket, result)
    }

    pub fn split(&mut self) -> Result<(), PipelineError> {
        let (ticket, request) = self.state.begin_split()?;
        let result = self.service.split(&request);
        self.state.complete_split(ticket, result)
    }

    pub fn train(&mut self) -> Result<(), PipelineError> {
        let (ticket, request) = self.state.begin_train()?;
        let result = self.service.train(&request);
        self.state.complete_train(ticket, result)
    }

    /// Evaluate and return the score.
    pub fn evaluate(&mut self) -> Result<f64, PipelineError> {
        let (ticket, request) = self.state.begin_evaluate()?;
        let result = self.service.evaluate(&request);
        self.state.complete_evaluate(ticket, result)?;
        self.state
            .score()
            .ok_or_else(|| PipelineError::malformed(Transition::Evaluate, "no score recorded"))
    }

    /// Send a snapshot of the current session to the service.
    pub fn save_config(&self) -> Result<ConfigBlob, PipelineError> {
        let blob = ConfigBlob::capture(&self.state)?;
        self.service
            .save_config(&blob)
            .map_err(|e| PipelineError::service(Transition::SaveConfig, e))?;
        log::info!("saved session config ({} rows)", blob.data.len());
        Ok(blob)
    }

    /// Replace the session with the service's stored snapshot.
    pub fn load_config(&mut self) -> Result<(), PipelineError> {
        let ticket = self.state.begin_load_config();
        let result = self.service.load_config();
        self.state.complete_load_config(ticket, result)
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}
